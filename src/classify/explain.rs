//! Explanation rules: map a message to a human-readable insight.
//!
//! A fixed, ordered list of pattern/text pairs scanned linearly; the first
//! match wins. Rule order is part of the contract -- more specific or more
//! severe patterns precede general ones where overlap is possible.

use once_cell::sync::Lazy;
use regex::Regex;

struct Rule {
    pattern: Regex,
    insight: &'static str,
}

fn rule(pattern: &str, insight: &'static str) -> Rule {
    Rule { pattern: Regex::new(pattern).unwrap(), insight }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"(?i)\b404\b|not found",
            "Repeated 404 responses usually indicate scanning or probing for hidden resources.",
        ),
        rule(
            r"(?i)\b500\b|internal server error",
            "Server errors can point to a failing backend or an exploitation attempt in progress.",
        ),
        rule(
            r"(?i)failed password|authentication failure|login failed|invalid password",
            "Clustered login failures are the signature of a credential brute-force attempt.",
        ),
        rule(
            r"(?i)segmentation fault|segfault|core dump",
            "A crashing process may indicate instability or a memory-corruption exploit.",
        ),
        rule(
            r"(?i)connection refused|connection timed? out|network error",
            "Refused or timed-out connections suggest a down service or traffic being blocked.",
        ),
        rule(
            r"(?i)\busb\b",
            "USB device activity on a monitored host is unusual and worth verifying.",
        ),
        rule(
            r"(?i)useradd|new user|account created|group ?add|added to group",
            "Account or group changes outside a change window deserve a closer look.",
        ),
        rule(
            r"(?i)\bsudo\b|elevated privilege|administrator",
            "Commands run with elevated privileges should match an authorized operator.",
        ),
    ]
});

/// Return the insight of the first matching rule, if any.
pub fn explain(message: &str) -> Option<&'static str> {
    RULES
        .iter()
        .find(|r| r.pattern.is_match(message))
        .map(|r| r.insight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_insight() {
        let insight = explain("GET /admin/config.php returned 404").unwrap();
        assert!(insight.contains("scanning"));
    }

    #[test]
    fn test_brute_force_insight() {
        let insight = explain("Failed password for root from 10.0.0.9").unwrap();
        assert!(insight.contains("brute-force"));
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(explain("routine heartbeat ok").is_none());
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        // Matches both the 404 rule and the login-failure rule; list order
        // makes the 404 rule win.
        let insight = explain("login failed, page returned 404").unwrap();
        assert!(insight.contains("404"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(explain("SEGMENTATION FAULT in worker").is_some());
    }
}
