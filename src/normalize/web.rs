//! Web access line extraction: comma-separated token lists such as
//! `10.0.0.1,GET,404,USA,Mozilla/5.0 Chrome/120`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::StructuredView;

static IPV4: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());
static STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-5]\d{2}$").unwrap());
static COUNTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+$").unwrap());

const METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "HEAD"];

// Capitalized user-agent fragments that collide with the country heuristic.
const BROWSER_TOKENS: [&str; 2] = ["Chrome", "Safari"];

/// Extract web access fields from a comma-separated token list. Returns
/// `None` when none of ip/method/status is present, letting the caller fall
/// through to the next detector.
pub(super) fn parse(message: &str) -> Option<StructuredView> {
    let tokens: Vec<&str> = message.split(',').map(str::trim).collect();

    let ip = tokens
        .iter()
        .find(|t| IPV4.is_match(t))
        .map(|t| t.to_string());
    let method = tokens
        .iter()
        .find(|t| METHODS.iter().any(|m| m.eq_ignore_ascii_case(t)))
        .map(|t| t.to_uppercase());
    let status = tokens
        .iter()
        .find(|t| STATUS.is_match(t))
        .map(|t| t.to_string());
    // Country: capitalized word longer than 3 characters that is not a
    // fragment of a known browser token. The length cutoff excludes short
    // country names; see the country-heuristic note in DESIGN.md.
    let country = tokens
        .iter()
        .find(|t| {
            COUNTRY.is_match(t) && t.len() > 3 && !BROWSER_TOKENS.iter().any(|b| b.contains(**t))
        })
        .map(|t| t.to_string());

    if ip.is_none() && method.is_none() && status.is_none() {
        return None;
    }

    Some(StructuredView::WebAccess { ip, method, status, country })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(msg: &str) -> (Option<String>, Option<String>, Option<String>, Option<String>) {
        match parse(msg) {
            Some(StructuredView::WebAccess { ip, method, status, country }) => {
                (ip, method, status, country)
            }
            other => panic!("expected WebAccess, got {:?}", other),
        }
    }

    #[test]
    fn test_full_line() {
        let (ip, method, status, country) = fields("203.0.113.7,POST,503,Germany");
        assert_eq!(ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(method.as_deref(), Some("POST"));
        assert_eq!(status.as_deref(), Some("503"));
        assert_eq!(country.as_deref(), Some("Germany"));
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let (_, method, _, _) = fields("10.0.0.1,get,200");
        assert_eq!(method.as_deref(), Some("GET"));
    }

    #[test]
    fn test_browser_fragments_are_not_countries() {
        // "Chrome" and a partial "Safar" both collide with the capitalized
        // word heuristic and must be excluded.
        let (_, _, _, country) = fields("10.0.0.1,GET,200,Chrome,Safar");
        assert_eq!(country, None);
    }

    #[test]
    fn test_short_country_names_excluded() {
        // Known ambiguity: the length>3 cutoff drops short names like "Usa".
        // Preserved as-is; see DESIGN.md.
        let (_, _, _, country) = fields("10.0.0.1,GET,200,Usa");
        assert_eq!(country, None);
    }

    #[test]
    fn test_no_web_fields_returns_none() {
        assert!(parse("just, some, words").is_none());
    }

    #[test]
    fn test_status_must_be_http_range() {
        // 999 is not a valid status class; 404 is.
        let (_, _, status, _) = fields("10.0.0.1,999,404");
        assert_eq!(status.as_deref(), Some("404"));
    }
}
