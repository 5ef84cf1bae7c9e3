//! Role list parsing.
//!
//! Source queries aggregate role names with `STRING_AGG(name, ',')`, so the
//! list arrives as one comma-joined string that may be empty, whitespace or
//! the literal `null` written by earlier CSV exports.

/// Split a comma-joined role list into trimmed, non-empty names.
pub fn parse_role_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().eq_ignore_ascii_case("null") {
        return Vec::new();
    }

    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Record roles first, then profile defaults, without duplicates.
pub fn merge_role_names(record_roles: Vec<String>, defaults: &[String]) -> Vec<String> {
    let mut merged = Vec::with_capacity(record_roles.len() + defaults.len());
    for name in record_roles.into_iter().chain(defaults.iter().cloned()) {
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_yield_no_roles() {
        assert!(parse_role_list(None).is_empty());
        assert!(parse_role_list(Some("")).is_empty());
        assert!(parse_role_list(Some("   ")).is_empty());
        assert!(parse_role_list(Some("null")).is_empty());
        assert!(parse_role_list(Some(" , ,")).is_empty());
    }

    #[test]
    fn test_split_and_trim() {
        assert_eq!(
            parse_role_list(Some(" ADMIN, USER ,,SUPPORT")),
            vec!["ADMIN", "USER", "SUPPORT"]
        );
    }

    #[test]
    fn test_merge_keeps_order_and_dedupes() {
        let merged = merge_role_names(
            vec!["USER".to_string(), "ADMIN".to_string()],
            &["CUSTOMER_USER".to_string(), "USER".to_string()],
        );
        assert_eq!(merged, vec!["USER", "ADMIN", "CUSTOMER_USER"]);
    }
}
