//! Event-type classification: label a message with a security event type
//! and a base severity, adjusted by the anomaly score and log level.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Severity;

struct Pattern {
    re: Regex,
    event_type: &'static str,
    base: Severity,
}

fn pat(re: &str, event_type: &'static str, base: Severity) -> Pattern {
    Pattern { re: Regex::new(re).unwrap(), event_type, base }
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    use Severity::{High, Low, Medium};
    vec![
        // Authentication
        pat(r"failed password|authentication failure|bad credentials|invalid password|login failed", "failed_login", Medium),
        pat(r"successful login|logged in|authentication successful", "successful_login", Low),
        pat(r"account locked|too many failed attempts|brute force", "account_lockout", High),
        // User/account management
        pat(r"user add|new user created|account created|useradd", "user_creation", Medium),
        pat(r"user deleted|account deleted|userdel", "user_deletion", Medium),
        pat(r"password changed|password reset|passwd", "password_change", Low),
        pat(r"group add|added to group|administrators|sudo", "privilege_escalation", High),
        // Processes
        pat(r"process created|new process|exec|spawn", "process_creation", Low),
        pat(r"suspicious process|malicious|trojan|backdoor", "suspicious_process", High),
        pat(r"process terminated|killed|stopped", "process_termination", Low),
        // Network
        pat(r"connection refused|connection timeout|network error", "network_error", Medium),
        pat(r"port scan|scanning|nmap|masscan", "port_scan", High),
        pat(r"unusual traffic|anomalous connection|suspicious ip", "network_anomaly", High),
        // Web/HTTP
        pat(r"404|not found|file not found", "web_scanning", Medium),
        pat(r"500|internal server error|server crash", "server_error", Medium),
        pat(r"sql injection|union select|script>|xss|code injection", "web_attack", High),
        // Files
        pat(r"file deleted|removed|unlink", "file_deletion", Low),
        pat(r"file modified|changed|altered", "file_modification", Low),
        pat(r"unauthorized access|permission denied|access violation", "file_access_violation", Medium),
        pat(r"ransomware|encrypted|crypto", "ransomware_activity", High),
        // System
        pat(r"segmentation fault|segfault|core dump|crash", "system_crash", High),
        pat(r"disk full|out of space|no space left", "disk_full", Medium),
        pat(r"service stopped|daemon failed|service unavailable", "service_failure", Medium),
        // Security
        pat(r"firewall|blocked|dropped|denied", "firewall_block", Low),
        pat(r"malware|virus|infected", "malware_detection", High),
        pat(r"audit log cleared|log deleted|evidence tampering", "log_tampering", High),
    ]
});

/// Windows event IDs mapped straight to event types.
const WINDOWS_EVENT_MAP: [(&str, &str, Severity); 8] = [
    ("4624", "successful_login", Severity::Low),
    ("4625", "failed_login", Severity::Medium),
    ("4720", "user_creation", Severity::Medium),
    ("4726", "user_deletion", Severity::Medium),
    ("4732", "privilege_escalation", Severity::High),
    ("4688", "process_creation", Severity::Low),
    ("1102", "log_tampering", Severity::High),
    ("4698", "scheduled_task_creation", Severity::Medium),
];

static EVENT_ID_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"event\s*id[:\s]+(\d+)").unwrap());

/// Classify a message into `(event_type, severity)`.
///
/// Windows event-id references take precedence, then the ordered pattern
/// table with score/level severity boosts, then score- and level-based
/// fallbacks.
pub fn classify_event(
    message: &str,
    level: Option<&str>,
    score: Option<f64>,
) -> (&'static str, Severity) {
    let lower = message.to_lowercase();

    if let Some(caps) = EVENT_ID_REF.captures(&lower) {
        let id = &caps[1];
        if let Some((_, event_type, sev)) = WINDOWS_EVENT_MAP.iter().find(|(eid, _, _)| eid == &id)
        {
            return (*event_type, *sev);
        }
    }

    for p in PATTERNS.iter() {
        if p.re.is_match(&lower) {
            return (p.event_type, adjust_severity(p.base, score, level));
        }
    }

    if let Some(s) = score {
        return if s > 0.8 {
            ("unknown_anomaly", Severity::High)
        } else if s > 0.5 {
            ("unknown_anomaly", Severity::Medium)
        } else {
            ("normal_activity", Severity::Low)
        };
    }

    match level.map(str::to_uppercase).as_deref() {
        Some("ERROR") | Some("CRITICAL") => ("unknown_error", Severity::Medium),
        Some("WARNING") => ("unknown_warning", Severity::Low),
        _ => ("normal_activity", Severity::Low),
    }
}

fn adjust_severity(base: Severity, score: Option<f64>, level: Option<&str>) -> Severity {
    let mut sev = base;
    match score {
        Some(s) if s > 0.8 => sev = sev.max(Severity::High),
        Some(s) if s > 0.5 => sev = sev.max(Severity::Medium),
        _ => {}
    }
    if let Some(l) = level {
        let upper = l.to_uppercase();
        if upper == "ERROR" || upper == "CRITICAL" {
            sev = sev.max(Severity::Medium);
        }
    }
    sev
}

/// Human-readable description for an event type.
pub fn event_description(event_type: &str) -> String {
    let known = match event_type {
        "failed_login" => "Failed Login Attempt",
        "successful_login" => "Successful Login",
        "account_lockout" => "Account Lockout",
        "user_creation" => "New User Account Created",
        "user_deletion" => "User Account Deleted",
        "password_change" => "Password Changed",
        "privilege_escalation" => "Privilege Escalation",
        "process_creation" => "Process Created",
        "suspicious_process" => "Suspicious Process Detected",
        "process_termination" => "Process Terminated",
        "network_error" => "Network Error",
        "port_scan" => "Port Scanning Activity",
        "network_anomaly" => "Network Anomaly",
        "web_scanning" => "Web Scanning/Enumeration",
        "server_error" => "Server Error",
        "web_attack" => "Web Attack Detected",
        "file_deletion" => "File Deleted",
        "file_modification" => "File Modified",
        "file_access_violation" => "Unauthorized File Access",
        "ransomware_activity" => "Ransomware Activity",
        "system_crash" => "System Crash",
        "disk_full" => "Disk Space Critical",
        "service_failure" => "Service Failure",
        "firewall_block" => "Firewall Block",
        "malware_detection" => "Malware Detected",
        "log_tampering" => "Log Tampering Detected",
        "scheduled_task_creation" => "Scheduled Task Created",
        "unknown_anomaly" => "Unknown Anomaly",
        "unknown_error" => "Unknown Error",
        "unknown_warning" => "Unknown Warning",
        "normal_activity" => "Normal Activity",
        _ => "",
    };
    if !known.is_empty() {
        return known.to_string();
    }
    // Title-case the identifier for types we have no label for.
    event_type
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
