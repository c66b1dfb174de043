//! Classification engines: severity banding, explanation and mitigation
//! rule tables, and event-type classification.
//!
//! Everything in this module is pure and stateless -- safe to call
//! concurrently from any number of request handlers.

pub mod event;
pub mod explain;
pub mod mitigate;

use serde::{Deserialize, Serialize};

pub use event::{classify_event, event_description};
pub use explain::explain;
pub use mitigate::{mitigate, Mitigation};

/// Discrete severity band for a scored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
    Pending,
}

impl Severity {
    /// Map an anomaly score to its band. Boundary values belong to the
    /// lower band: 0.8 is Medium, 0.5 is Low.
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Severity::Pending,
            Some(s) if s > 0.8 => Severity::High,
            Some(s) if s > 0.5 => Severity::Medium,
            Some(_) => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Pending => "Pending",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Severity::Pending => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    /// The more severe of two bands.
    pub(crate) fn max(self, other: Severity) -> Severity {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Severity::High),
            "Medium" => Ok(Severity::Medium),
            "Low" => Ok(Severity::Low),
            "Pending" => Ok(Severity::Pending),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bands() {
        assert_eq!(Severity::from_score(Some(0.95)), Severity::High);
        assert_eq!(Severity::from_score(Some(0.81)), Severity::High);
        assert_eq!(Severity::from_score(Some(0.6)), Severity::Medium);
        assert_eq!(Severity::from_score(Some(0.2)), Severity::Low);
        assert_eq!(Severity::from_score(Some(0.0)), Severity::Low);
        assert_eq!(Severity::from_score(None), Severity::Pending);
    }

    #[test]
    fn test_boundaries_belong_to_lower_band() {
        assert_eq!(Severity::from_score(Some(0.8)), Severity::Medium);
        assert_eq!(Severity::from_score(Some(0.5)), Severity::Low);
    }

    #[test]
    fn test_max_prefers_more_severe() {
        assert_eq!(Severity::Low.max(Severity::High), Severity::High);
        assert_eq!(Severity::High.max(Severity::Low), Severity::High);
        assert_eq!(Severity::Pending.max(Severity::Medium), Severity::Medium);
    }
}
