//! Reading audit files back.

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::sink::AUDIT_HEADER;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Parse every well-formed entry of an audit file, skipping the header and
/// lines that do not parse.
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in data_lines(&content) {
        match AuditEntry::parse_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::debug!(error = %e, "Skipping unparsable audit line"),
        }
    }

    Ok(entries)
}

/// Record ids of every successful identity creation in an audit file.
///
/// Lines written before entries carried an `action` key, and lines using the
/// older `db_user_id`/`customer_id` keys, are accepted too. Ids are returned
/// in file order without duplicates.
pub fn migrated_record_ids(path: impl AsRef<Path>) -> Result<Vec<String>, AuditError> {
    let content = fs::read_to_string(path)?;
    let mut ids: Vec<String> = Vec::new();

    for line in data_lines(&content) {
        let Some((_, json)) = line.split_once(',') else {
            continue;
        };
        let Ok(payload) = serde_json::from_str::<Value>(json) else {
            tracing::debug!(line, "Skipping unparsable audit line");
            continue;
        };

        if payload.get("status").and_then(Value::as_str) != Some("SUCCESS") {
            continue;
        }
        match payload.get("action").and_then(Value::as_str) {
            None | Some("CREATE_USER") => {}
            Some(_) => continue,
        }

        let id = ["record_id", "db_user_id", "customer_id"]
            .iter()
            .find_map(|key| payload.get(*key))
            .and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        if let Some(id) = id
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }

    Ok(ids)
}

fn data_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(AUDIT_HEADER))
}
