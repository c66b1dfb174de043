//! Raw line ingestion: extract timestamp, level, and message from
//! heterogeneous log lines before they enter the store.

pub mod collect;
pub mod tail;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}:\d{2}(?:\.\d+)?)").unwrap()
});
static LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(DEBUG|INFO|WARN|WARNING|ERROR|CRITICAL)\b").unwrap());

/// A raw line split into its stored fields.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedLine {
    pub raw: String,
    pub ts: Option<String>,
    pub level: Option<String>,
    pub message: String,
}

/// Parse one raw log line. JSON object lines are tried first; anything
/// else gets regex timestamp/level extraction with the residue as message.
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();

    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str(line) {
        let ts = ["timestamp", "time", "ts"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .map(normalize_ts);
        let level = ["level", "severity"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .map(normalize_level);
        let message = ["message", "msg"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| serde_json::Value::Object(obj.clone()).to_string());
        return ParsedLine { raw: line.to_string(), ts, level, message };
    }

    let ts = TS.captures(line).map(|c| normalize_ts(&c[1]));
    let level = LEVEL.captures(line).map(|c| normalize_level(&c[1]));

    let mut message = line.to_string();
    if let Some(c) = TS.captures(line) {
        message = message.replace(&c[1], "");
    }
    if let Some(c) = LEVEL.captures(line) {
        message = message.replace(&c[1], "");
    }

    ParsedLine {
        raw: line.to_string(),
        ts,
        level,
        message: message.trim().to_string(),
    }
}

/// Parse a whole text body of lines, skipping blanks.
pub fn parse_body(body: &str) -> Vec<ParsedLine> {
    body.lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_line)
        .collect()
}

/// Accept ISO-like and 'YYYY-MM-DD HH:MM:SS' timestamps, pass anything
/// else through untouched.
fn normalize_ts(val: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&val.replace('Z', "+00:00")) {
        return dt.to_rfc3339();
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(val, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    }
    val.to_string()
}

fn normalize_level(level: &str) -> String {
    let upper = level.to_uppercase();
    if upper == "WARN" {
        "WARNING".to_string()
    } else {
        upper
    }
}
