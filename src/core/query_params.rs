use std::collections::HashMap;

/// Parse query parameters from a URI string.
///
/// Handles URL decoding and returns a map of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is
/// kept).
///
/// # Example
/// ```
/// use chirp::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/profile?user=john&page=2");
/// assert_eq!(params.get("user"), Some(&"john".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a string parameter from parsed query params with optional default
pub fn get_string(
    params: &HashMap<String, String>,
    key: &str,
    default: Option<&str>,
) -> Option<String> {
    params
        .get(key)
        .cloned()
        .or_else(|| default.map(|d| d.to_string()))
}

/// Get a boolean flag parameter (e.g., ?registered=true)
pub fn get_bool_flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).map(|v| v == "true" || v == "1").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_encoded_values() {
        let params = parse_query_params("/search?q=jane%20doe");
        assert_eq!(params.get("q"), Some(&"jane doe".to_string()));
    }

    #[test]
    fn handles_missing_query() {
        assert!(parse_query_params("/profile").is_empty());
    }

    #[test]
    fn flag_params_and_defaults() {
        let params = parse_query_params("/login?registered=1");
        assert!(get_bool_flag(&params, "registered"));
        assert_eq!(
            get_string(&params, "missing", Some("fallback")),
            Some("fallback".to_string())
        );
    }
}
