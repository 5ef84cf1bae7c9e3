use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::Context;

#[derive(Parser, Debug)]
#[command(name = "ferry", version, about = "Migrate database users into an identity provider")]
struct Cli {
    /// Configuration file (.yaml or .toml). Without one, settings come from the environment.
    #[arg(long, global = true, env = "FERRY_CONFIG")]
    config: Option<PathBuf>,

    /// Load environment variables from this file instead of `.env`.
    #[arg(long = "env-file", global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create provider accounts for every record without one.
    Migrate {
        /// Migration profile (built-in: users, customers).
        #[arg(long, default_value = "users")]
        profile: String,

        /// Read pending records from a CSV snapshot instead of the database.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Realm role management.
    Roles {
        #[command(subcommand)]
        cmd: RolesCommand,
    },

    /// Issue temporary passwords to already-migrated records.
    Passwords {
        #[arg(long, default_value = "customers")]
        profile: String,
    },

    /// Export source data to files.
    Export {
        #[command(subcommand)]
        cmd: ExportCommand,
    },

    /// Clear identity references recorded as created in an audit log.
    Reset {
        #[arg(long, default_value = "users")]
        profile: String,

        /// Audit log to read (default: the profile's migration log).
        #[arg(long)]
        log: Option<PathBuf>,

        /// Record ids to leave untouched (comma separated or repeated).
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Print the ids instead of updating the database.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Show the source record carrying an identity reference.
    Check {
        #[arg(long, default_value = "users")]
        profile: String,

        /// Identity reference assigned by the provider.
        #[arg(long)]
        identity: String,
    },
}

#[derive(Subcommand, Debug)]
enum RolesCommand {
    /// Create realm roles; existing roles are reported, not failed.
    Create {
        /// Role names.
        names: Vec<String>,

        /// Newline-delimited file of role names (e.g. roles.txt).
        #[arg(long = "from-file")]
        from_file: Option<PathBuf>,

        /// Read role names from the `roles` table.
        #[arg(long = "from-db", default_value_t = false)]
        from_db: bool,
    },

    /// Assign a comma-separated role list to one identity.
    Assign {
        identity: String,
        roles: String,
    },
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Role names, one per line.
    Roles {
        #[arg(long, default_value = "roles.txt")]
        output: PathBuf,
    },

    /// A whole table as CSV (`table` or `schema.table`).
    Table {
        table: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Pending records of a profile, in the snapshot format `migrate --snapshot` reads.
    Pending {
        #[arg(long, default_value = "users")]
        profile: String,
        #[arg(long, default_value = "users_with_roles.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Environment first, so RUST_LOG from the file applies.
    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map_err(|e| (path.clone(), e)),
        None => {
            dotenvy::dotenv().ok();
            Ok(())
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err((path, e)) = env_loaded {
        tracing::error!(path = %path.display(), error = %e, "Failed to load env file");
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ferry_runtime::RunOutcome> {
    let ctx = Context::load(cli.config.as_deref())?;

    match cli.cmd {
        Command::Migrate { profile, snapshot } => {
            commands::migrate::run(&ctx, &profile, snapshot).await
        }
        Command::Roles { cmd } => match cmd {
            RolesCommand::Create {
                names,
                from_file,
                from_db,
            } => commands::roles::create(&ctx, names, from_file, from_db).await,
            RolesCommand::Assign { identity, roles } => {
                commands::roles::assign(&ctx, &identity, &roles).await
            }
        },
        Command::Passwords { profile } => commands::passwords::run(&ctx, &profile).await,
        Command::Export { cmd } => match cmd {
            ExportCommand::Roles { output } => commands::export::roles(&ctx, &output).await,
            ExportCommand::Table { table, output } => {
                commands::export::table(&ctx, &table, output).await
            }
            ExportCommand::Pending { profile, output } => {
                commands::export::pending(&ctx, &profile, &output).await
            }
        },
        Command::Reset {
            profile,
            log,
            exclude,
            dry_run,
        } => commands::reset::run(&ctx, &profile, log, &exclude, dry_run).await,
        Command::Check { profile, identity } => {
            commands::check::run(&ctx, &profile, &identity).await
        }
    }
}
