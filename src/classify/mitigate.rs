//! Mitigation rules: map a message to a suggested containment action and a
//! command template. Proposals only -- nothing here executes anything.
//!
//! Same first-match-wins semantics as the explanation rules, over a
//! separate ordered list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A proposed containment action with its command template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mitigation {
    pub action: String,
    pub command: String,
}

struct Rule {
    pattern: Regex,
    action: &'static str,
    command: &'static str,
}

fn rule(pattern: &str, action: &'static str, command: &'static str) -> Rule {
    Rule { pattern: Regex::new(pattern).unwrap(), action, command }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            r"(?i)failed password|authentication failure|brute force|login failed",
            "Block the source IP at the firewall",
            "iptables -A INPUT -j DROP -s",
        ),
        rule(
            r"(?i)\b404\b|port scan|scanning",
            "Block the scanning host at the firewall",
            "iptables -A INPUT -j DROP -s",
        ),
        rule(
            r"(?i)useradd|account created|added to group|group ?add|user deleted",
            "Review recent account and group changes",
            "ausearch -m ADD_USER,ADD_GROUP,DEL_USER -ts recent",
        ),
        rule(
            r"(?i)\bsudo\b|elevated privilege|administrator",
            "Audit the elevated session",
            "aureport --summary -au",
        ),
        rule(
            r"(?i)sql injection|union select|<script|\bxss\b|code injection",
            "Block the web attack source at the firewall",
            "iptables -A INPUT -j DROP -s",
        ),
    ]
});

static IPV4_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

/// Return the first matching mitigation, if any. When the message contains
/// an IPv4 address anywhere, it is appended verbatim to the command
/// template; the firewall rules rely on this.
pub fn mitigate(message: &str) -> Option<Mitigation> {
    let matched = RULES.iter().find(|r| r.pattern.is_match(message))?;

    let command = match IPV4_ANYWHERE.find(message) {
        Some(ip) => format!("{} {}", matched.command, ip.as_str()),
        None => matched.command.to_string(),
    };

    Some(Mitigation { action: matched.action.to_string(), command })
}
