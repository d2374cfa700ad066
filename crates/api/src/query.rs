//! Shared query and form parameter types for handlers.

use serde::Deserialize;

/// Query parameters for `GET /<model>/inline_data`.
#[derive(Debug, Deserialize)]
pub struct InlineDataParams {
    pub parent_id: Option<String>,
    pub inline_model: Option<String>,
}

/// Last non-empty value submitted under `key`.
pub fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// Record ids from a batch form: repeated `ids[]` fields or a comma
/// separated `ids` field.
pub fn submitted_ids(pairs: &[(String, String)]) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == "ids[]" || k == "ids")
        .flat_map(|(_, v)| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn last_value_wins() {
        let p = pairs(&[("format", "csv"), ("format", "excel"), ("ids", "  ")]);
        assert_eq!(param(&p, "format"), Some("excel"));
        assert_eq!(param(&p, "ids"), None);
        assert_eq!(param(&p, "missing"), None);
    }

    #[test]
    fn ids_from_either_form() {
        let p = pairs(&[("ids[]", "1"), ("ids[]", "2"), ("ids", "3, 4,"), ("other", "9")]);
        assert_eq!(submitted_ids(&p), ["1", "2", "3", "4"]);
        assert!(submitted_ids(&[]).is_empty());
    }
}
