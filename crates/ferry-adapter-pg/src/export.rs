//! Exports of source data to flat files.

use crate::queries::{select_table_as_text, split_table_name};
use anyhow::Context;
use sqlx::{PgPool, Row};
use std::fs;
use std::path::Path;

/// Every role name in the `roles` table, sorted.
pub async fn fetch_role_names(pool: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query("SELECT name::text AS name FROM roles ORDER BY name")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|r| r.try_get::<String, _>("name").map_err(Into::into))
        .collect()
}

/// Write role names one per line, the format `roles create --from-file` reads.
pub async fn export_role_names(pool: &PgPool, path: &Path) -> anyhow::Result<usize> {
    let names = fetch_role_names(pool).await?;
    let mut contents = names.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(count = names.len(), path = %path.display(), "Exported roles");
    Ok(names.len())
}

/// Column names of `schema.table` in ordinal order.
pub async fn table_columns(pool: &PgPool, schema: &str, table: &str) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select column_name::text as column_name
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| r.try_get::<String, _>("column_name").map_err(Into::into))
        .collect()
}

/// Dump a whole table to CSV with a header row. Values are rendered as text;
/// NULL becomes an empty field. Returns the number of data rows.
pub async fn export_table(pool: &PgPool, table_name: &str, path: &Path) -> anyhow::Result<usize> {
    let (schema, table) = split_table_name(table_name);
    let columns = table_columns(pool, schema, table).await?;
    if columns.is_empty() {
        anyhow::bail!("table {}.{} not found or has no columns", schema, table);
    }

    let rows = sqlx::query(&select_table_as_text(schema, table, &columns))
        .fetch_all(pool)
        .await?;

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(&columns)?;
    for row in &rows {
        let mut fields = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value: Option<String> = row.try_get(i)?;
            fields.push(value.unwrap_or_default());
        }
        writer.write_record(&fields)?;
    }
    writer.flush()?;

    tracing::info!(table = %table_name, rows = rows.len(), path = %path.display(), "Exported table");
    Ok(rows.len())
}
