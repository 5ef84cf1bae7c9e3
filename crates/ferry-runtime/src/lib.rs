//! # ferry-runtime
//!
//! The provisioning workflow, written against two seams: [`IdentityProvider`]
//! for the identity provider's admin API and the store traits in [`store`]
//! for the source database. The HTTP and SQL implementations live in their
//! own crates.

pub mod creator;
pub mod driver;
pub mod error;
pub mod maintenance;
pub mod password;
pub mod provider;
pub mod roles;
pub mod snapshot;
pub mod store;
pub mod token;

pub use creator::{CreatedIdentity, IdentityCreator, Username, build_new_user, choose_username};
pub use driver::{BatchDriver, BatchReport, RunOutcome};
pub use error::{ProviderError, ProvisioningError, RunError};
pub use maintenance::{
    PasswordReport, RoleCreationReport, assign_roles_to, create_roles, ensure_roles,
    issue_passwords,
};
pub use password::{PasswordIssuer, generate_password};
pub use provider::{IdentityProvider, RoleCreation};
pub use roles::{RoleAssigner, RoleAssignment};
pub use snapshot::{CsvSnapshot, write_snapshot};
pub use store::{MappingWriter, MigratedSource, RecordSource};
pub use token::TokenSession;
