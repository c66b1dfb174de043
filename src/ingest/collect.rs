//! Log collection sources for the scheduler's collect step.
//!
//! OS specifics stay behind the `LogSource` seam; the scheduler consumes
//! whatever source it is given.

use anyhow::Result;
use async_trait::async_trait;

use super::{parse_line, ParsedLine};

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Collect up to `max_items` raw lines, parsed.
    async fn collect(&self, max_items: usize) -> Result<Vec<ParsedLine>>;
}

/// Collects from the systemd journal, falling back to common syslog files
/// when journalctl is unavailable.
pub struct JournalSource;

#[async_trait]
impl LogSource for JournalSource {
    async fn collect(&self, max_items: usize) -> Result<Vec<ParsedLine>> {
        let output = tokio::process::Command::new("journalctl")
            .args(["-n", &max_items.to_string(), "-o", "short"])
            .output()
            .await;

        if let Ok(out) = output {
            if out.status.success() {
                let text = String::from_utf8_lossy(&out.stdout);
                return Ok(text
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(parse_line)
                    .collect());
            }
        }

        // journalctl missing or failed: read the classic files instead.
        let mut lines = Vec::new();
        for path in ["/var/log/syslog", "/var/log/messages", "/var/log/auth.log"] {
            let Ok(content) = tokio::fs::read_to_string(path).await else {
                continue;
            };
            let tail: Vec<&str> = content.lines().collect();
            let start = tail.len().saturating_sub(max_items);
            lines.extend(tail[start..].iter().map(|l| parse_line(l)));
        }
        Ok(lines)
    }
}

/// A fixed in-memory source, for tests and one-shot runs over captured
/// data.
pub struct StaticSource {
    lines: Vec<String>,
}

impl StaticSource {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl LogSource for StaticSource {
    async fn collect(&self, max_items: usize) -> Result<Vec<ParsedLine>> {
        Ok(self.lines.iter().take(max_items).map(|l| parse_line(l)).collect())
    }
}
