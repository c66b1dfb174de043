//! Anomaly scoring model.
//!
//! The rest of the system treats the scorer as an opaque oracle producing
//! floats in [0,1]; this module ships a token-rarity model with keyword
//! boosts for messages that are obviously hostile. An untrained scorer
//! scores nothing, which downstream classification reports as Pending
//! rather than an error.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::storage::LogRecord;

/// A score assigned to one record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoredRecord {
    pub id: i64,
    pub score: f64,
    pub is_anomaly: bool,
}

/// Scoring oracle contract: train over a corpus, then score records.
pub trait Scorer: Send {
    /// Fit the model to the corpus. Returns the number of samples used.
    fn train(&mut self, records: &[LogRecord]) -> usize;

    fn is_trained(&self) -> bool;

    /// Score records in [0,1], higher = more anomalous. Returns an empty
    /// vec when untrained.
    fn score(&self, records: &[LogRecord]) -> Vec<ScoredRecord>;
}

const ANOMALY_THRESHOLD: f64 = 0.6;

/// Rarity-based scorer: messages made of tokens rarely seen in the trained
/// corpus score high.
#[derive(Default)]
pub struct TokenFrequencyScorer {
    doc_freq: HashMap<String, usize>,
    total_docs: usize,
}

impl TokenFrequencyScorer {
    pub fn new() -> Self {
        Self::default()
    }

    fn rarity(&self, message: &str) -> f64 {
        let tokens = tokenize(message);
        if tokens.is_empty() || self.total_docs == 0 {
            return 0.0;
        }
        let max_idf = ((self.total_docs + 1) as f64).ln();
        if max_idf == 0.0 {
            return 0.0;
        }
        let sum: f64 = tokens
            .iter()
            .map(|t| {
                let df = self.doc_freq.get(t).copied().unwrap_or(0);
                ((self.total_docs + 1) as f64 / (df + 1) as f64).ln() / max_idf
            })
            .sum();
        (sum / tokens.len() as f64).clamp(0.0, 1.0)
    }
}

impl Scorer for TokenFrequencyScorer {
    fn train(&mut self, records: &[LogRecord]) -> usize {
        self.doc_freq.clear();
        for record in records {
            for token in tokenize(&record.message) {
                *self.doc_freq.entry(token).or_insert(0) += 1;
            }
        }
        self.total_docs = records.len();
        self.total_docs
    }

    fn is_trained(&self) -> bool {
        self.total_docs > 0
    }

    fn score(&self, records: &[LogRecord]) -> Vec<ScoredRecord> {
        if !self.is_trained() {
            return Vec::new();
        }
        records
            .iter()
            .map(|record| {
                let mut score = self.rarity(&record.message);
                let mut is_anomaly = score > ANOMALY_THRESHOLD;

                // Obvious hostile keywords override the statistical score.
                let upper = record.message.to_uppercase();
                if upper.contains("CRITICAL")
                    || upper.contains("SQL INJECTION")
                    || upper.contains("ATTACK")
                {
                    score = score.max(0.95);
                    is_anomaly = true;
                } else if upper.contains("ERROR") || upper.contains("FAIL") {
                    score = score.max(0.6);
                    if score > ANOMALY_THRESHOLD {
                        is_anomaly = true;
                    }
                }

                ScoredRecord { id: record.id, score, is_anomaly }
            })
            .collect()
    }
}

fn tokenize(message: &str) -> HashSet<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, message: &str) -> LogRecord {
        LogRecord {
            id,
            ts: None,
            level: None,
            message: message.to_string(),
            raw: message.to_string(),
            added_at: String::new(),
            anomaly_score: None,
            is_anomaly: false,
        }
    }

    #[test]
    fn test_untrained_scores_nothing() {
        let scorer = TokenFrequencyScorer::new();
        assert!(!scorer.is_trained());
        assert!(scorer.score(&[record(1, "anything")]).is_empty());
    }

    #[test]
    fn test_scores_are_bounded() {
        let mut scorer = TokenFrequencyScorer::new();
        let corpus: Vec<LogRecord> = (0..50)
            .map(|i| record(i, "nginx access request served ok"))
            .collect();
        scorer.train(&corpus);

        let scored = scorer.score(&[
            record(100, "nginx access request served ok"),
            record(101, "zxqv unprecedented gibberish payload"),
        ]);
        for s in &scored {
            assert!((0.0..=1.0).contains(&s.score));
        }
        // The common message must score below the never-seen one.
        assert!(scored[0].score < scored[1].score);
    }

    #[test]
    fn test_hostile_keyword_boost() {
        let mut scorer = TokenFrequencyScorer::new();
        scorer.train(&[record(1, "normal traffic line")]);

        let scored = scorer.score(&[record(2, "SQL injection attempt detected")]);
        assert!(scored[0].score >= 0.95);
        assert!(scored[0].is_anomaly);
    }

    #[test]
    fn test_error_keyword_floor() {
        let mut scorer = TokenFrequencyScorer::new();
        let corpus: Vec<LogRecord> =
            (0..20).map(|i| record(i, "error writing to disk failed")).collect();
        scorer.train(&corpus);

        // Common corpus text would score low; ERROR floors it at 0.6.
        let scored = scorer.score(&[record(100, "error writing to disk failed")]);
        assert!(scored[0].score >= 0.6);
    }
}
