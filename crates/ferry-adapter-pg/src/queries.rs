//! SQL for each source kind.
//!
//! Every query returns the same column set (`id`, `email`, `first_name`,
//! `last_name`, `phone`, `identity_ref`, `roles`, all text) so one row mapper
//! serves both tables. Ids are compared as text, which covers integer and
//! UUID keys alike.

use ferry_core::SourceKind;

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Which records a select should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// `keycloak_user_id IS NULL`
    Pending,
    /// `keycloak_user_id IS NOT NULL`
    Migrated,
    /// `keycloak_user_id = $1`
    ByIdentity,
}

impl Selection {
    fn predicate(&self, alias: &str) -> String {
        match self {
            Self::Pending => format!("{}keycloak_user_id IS NULL", alias),
            Self::Migrated => format!("{}keycloak_user_id IS NOT NULL", alias),
            Self::ByIdentity => format!("{}keycloak_user_id::text = $1", alias),
        }
    }
}

/// The table a source kind writes identity references to.
pub fn table(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Users => "\"user\"",
        SourceKind::Customers => "customer_user",
    }
}

pub fn select_records(kind: SourceKind, selection: Selection) -> String {
    match kind {
        SourceKind::Users => format!(
            r#"
            SELECT u.id::text AS id,
                   COALESCE(u.email, '') AS email,
                   u.first_name::text AS first_name,
                   u.last_name::text AS last_name,
                   u."phoneNumber"::text AS phone,
                   u.keycloak_user_id::text AS identity_ref,
                   STRING_AGG(r.name, ',') AS roles
            FROM "user" u
            LEFT JOIN user_roles ur ON u.id = ur."userId"
            LEFT JOIN roles r ON ur."roleId" = r.id
            WHERE {}
            GROUP BY u.id, u.email, u.first_name, u.last_name, u."phoneNumber", u.keycloak_user_id
            ORDER BY u.id
            "#,
            selection.predicate("u.")
        ),
        SourceKind::Customers => format!(
            r#"
            SELECT id::text AS id,
                   COALESCE(email, '') AS email,
                   name::text AS first_name,
                   NULL::text AS last_name,
                   NULL::text AS phone,
                   keycloak_user_id::text AS identity_ref,
                   NULL::text AS roles
            FROM customer_user
            WHERE {}
            ORDER BY id
            "#,
            selection.predicate("")
        ),
    }
}

/// Map one record; rows that already carry a reference are left alone.
pub fn update_mapping(kind: SourceKind) -> String {
    format!(
        "UPDATE {} SET keycloak_user_id = $1 WHERE id::text = $2 AND keycloak_user_id IS NULL",
        table(kind)
    )
}

/// Ids among `$1` that are still unmapped.
pub fn select_pending_ids(kind: SourceKind) -> String {
    format!(
        "SELECT id::text AS id FROM {} WHERE id::text = ANY($1) AND keycloak_user_id IS NULL",
        table(kind)
    )
}

pub fn clear_mappings(kind: SourceKind) -> String {
    format!(
        "UPDATE {} SET keycloak_user_id = NULL WHERE id::text = ANY($1)",
        table(kind)
    )
}

/// Select every column of `schema.table` as text, in ordinal order.
pub fn select_table_as_text(schema: &str, table: &str, columns: &[String]) -> String {
    let list = columns
        .iter()
        .map(|c| format!("{}::text", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {} FROM {}.{}",
        list,
        quote_ident(schema),
        quote_ident(table)
    )
}

/// Split `schema.table`; a bare name is in `public`.
pub fn split_table_name(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("public", name),
    }
}
