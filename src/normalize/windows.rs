//! Windows security event extraction: dictionary-shaped messages such as
//! `{'Event ID': '4625', 'Message': 'An account failed to log on...'}`.
//!
//! Extraction is a chain of fallible sub-parses with explicit fallbacks;
//! nothing here errors, the caller degrades to Generic instead.

use once_cell::sync::Lazy;
use regex::Regex;

use super::StructuredView;

static EVENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"'Event ID':\s*'(\d+)'").unwrap());
static SOURCE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"'Source':\s*'(\d+)'").unwrap());
static MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'Message':\s*'((?:\\.|[^'\\])*)'").unwrap());
static TASK_CATEGORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'Task Category':\s*'((?:\\.|[^'\\])*)'").unwrap());

/// Well-known Windows security event IDs.
const KNOWN_EVENTS: [(&str, &str); 17] = [
    ("4624", "Successful Logon"),
    ("4625", "Failed Logon (Invalid Credentials)"),
    ("4634", "Logoff"),
    ("4648", "Logon Using Explicit Credentials"),
    ("4672", "Special Privileges Assigned to New Logon"),
    ("4673", "Privileged Service Called"),
    ("4688", "New Process Created"),
    ("4698", "Scheduled Task Created"),
    ("4720", "User Account Created"),
    ("4722", "User Account Enabled"),
    ("4724", "Password Reset Attempt"),
    ("4725", "User Account Disabled"),
    ("4726", "User Account Deleted"),
    ("4732", "Member Added to Security-Enabled Group"),
    ("4733", "Member Removed from Security-Enabled Group"),
    ("4740", "Account Locked Out"),
    ("1102", "Audit Log Cleared"),
];

/// Parse a dictionary-shaped Windows event message. Returns `None` when the
/// message does not look like one.
pub(super) fn parse(message: &str) -> Option<StructuredView> {
    let trimmed = message.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    if !trimmed.contains("Event ID") && !trimmed.contains("Source") {
        return None;
    }

    let event_id = first_capture(&EVENT_ID, trimmed)
        .or_else(|| first_capture(&SOURCE_ID, trimmed))
        .unwrap_or_else(|| "Unknown".to_string());

    let raw_text = first_capture(&MESSAGE, trimmed)
        .or_else(|| first_capture(&TASK_CATEGORY, trimmed))
        .map(|t| unescape(&t))
        .unwrap_or_default();

    let description = describe(&event_id, &raw_text);

    Some(StructuredView::WindowsEvent { event_id, description, raw_text })
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

/// Un-escape the literal two-character sequences carried in dictionary
/// string values.
fn unescape(text: &str) -> String {
    text.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\'", "'")
}

fn describe(event_id: &str, raw_text: &str) -> String {
    if let Some((_, desc)) = KNOWN_EVENTS.iter().find(|(id, _)| *id == event_id) {
        return desc.to_string();
    }

    // Synthesize from the first line of the task text.
    let first_line = raw_text.lines().next().unwrap_or("").trim();
    let synthesized = if first_line.chars().count() > 80 {
        let truncated: String = first_line.chars().take(80).collect();
        format!("{truncated}...")
    } else {
        first_line.to_string()
    };

    if synthesized.chars().count() < 5 {
        format!("Windows Event {event_id}")
    } else {
        synthesized
    }
}
