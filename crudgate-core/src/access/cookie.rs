//! Cookie header parsing

use std::collections::HashMap;

/// Parse a `Cookie` header into name/value pairs
///
/// Pairs are split on `;`, then on the first `=`. Names and values are trimmed,
/// pairs with an empty side are dropped and values are percent-decoded (a value
/// that fails to decode is kept as sent). When a name repeats, the later value wins.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            continue;
        }
        let value = urlencoding::decode(value)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| value.to_string());
        cookies.insert(name.to_string(), value);
    }

    cookies
}

/// Find a single cookie value by name
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    parse_cookie_header(header).remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("Authorization=abc.def.ghi; theme=dark");
        assert_eq!(cookies.get("Authorization").map(String::as_str), Some("abc.def.ghi"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_value_keeps_equals_after_first() {
        let cookies = parse_cookie_header("token=a=b=c");
        assert_eq!(cookies.get("token").map(String::as_str), Some("a=b=c"));
    }

    #[test]
    fn test_percent_decoding_and_trimming() {
        let cookies = parse_cookie_header("  name = hello%20world ;");
        assert_eq!(cookies.get("name").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn test_skips_malformed_pairs() {
        let cookies = parse_cookie_header("novalue; =orphan; empty=; ok=1");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.get("ok").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        assert_eq!(cookie_value("a=1; a=2", "a"), Some("2".to_string()));
        assert_eq!(cookie_value("a=1", "b"), None);
    }
}
