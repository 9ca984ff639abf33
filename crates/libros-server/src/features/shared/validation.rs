//! Query parameter validation
//!
//! Empty query parameters (`?collectionName=`) are treated exactly like absent ones.

/// Borrow an optional parameter; empty counts as absent.
pub fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Borrow a required parameter, failing with `missing` when absent or empty.
pub fn require<'a, E>(value: &'a Option<String>, missing: E) -> Result<&'a str, E> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional() {
        assert_eq!(optional(&None), None);
        assert_eq!(optional(&Some(String::new())), None);
        assert_eq!(optional(&Some("x".into())), Some("x"));
    }

    #[test]
    fn test_require() {
        assert_eq!(require(&Some("a".to_string()), "missing"), Ok("a"));
        assert_eq!(require(&Some(String::new()), "missing"), Err("missing"));
        assert_eq!(require(&None, "missing"), Err("missing"));
    }
}
