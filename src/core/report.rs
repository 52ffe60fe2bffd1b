use crate::domain::model::{AddressFailure, BatchKind};
use serde::Serialize;
use std::fmt;

/// Counters for one batch. Every item ends up in exactly one of
/// `successes` or `errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub requested: usize,
    pub successes: usize,
    pub errors: usize,
}

impl BatchStats {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Default::default()
        }
    }

    pub fn processed(&self) -> usize {
        self.successes + self.errors
    }

    pub fn is_complete(&self) -> bool {
        self.processed() == self.requested
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressError {
    pub index: usize,
    pub source: String,
    pub failure: AddressFailure,
}

/// Results log shown after a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub stats: BatchStats,
    pub errors: Vec<AddressError>,
}

impl BatchReport {
    pub fn new(kind: BatchKind, requested: usize) -> Self {
        Self {
            kind,
            stats: BatchStats::new(requested),
            errors: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.stats.successes += 1;
    }

    pub fn record_failure(&mut self, index: usize, source: &str, failure: AddressFailure) {
        tracing::warn!("Address {} failed ({}): {}", index + 1, source, failure);
        self.stats.errors += 1;
        self.errors.push(AddressError {
            index,
            source: source.to_string(),
            failure,
        });
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.errors.is_empty() {
            lines.push("Address Errors".to_string());
            let mut errors: Vec<&AddressError> = self.errors.iter().collect();
            errors.sort_by_key(|e| e.index);
            for e in errors {
                lines.push(format!("{} ({})", e.source, e.failure));
            }
        }
        match self.kind {
            BatchKind::Forward => {
                lines.push(format!(
                    "Number of Addresses Processed: {}",
                    self.stats.processed()
                ));
            }
            BatchKind::Reverse => {
                lines.push(format!("Total Points Processed: {}", self.stats.processed()));
            }
        }
        lines.push(format!("Number of Successes: {}", self.stats.successes));
        lines.push(format!("Number of Errors: {}", self.stats.errors));
        lines.push("Processing Complete!".to_string());
        lines
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_is_successes_plus_errors() {
        let mut report = BatchReport::new(BatchKind::Forward, 3);
        report.record_success();
        report.record_failure(1, "nowhere", AddressFailure::NoResults);
        assert!(!report.stats.is_complete());
        report.record_success();
        assert_eq!(report.stats.processed(), 3);
        assert!(report.stats.is_complete());
    }

    #[test]
    fn test_forward_report_lines() {
        let mut report = BatchReport::new(BatchKind::Forward, 2);
        report.record_failure(1, "Atlantis", AddressFailure::NoResults);
        report.record_success();
        assert_eq!(
            report.lines(),
            vec![
                "Address Errors",
                "Atlantis (no results)",
                "Number of Addresses Processed: 2",
                "Number of Successes: 1",
                "Number of Errors: 1",
                "Processing Complete!",
            ]
        );
    }

    #[test]
    fn test_reverse_report_without_errors() {
        let mut report = BatchReport::new(BatchKind::Reverse, 1);
        report.record_success();
        let text = report.to_string();
        assert!(text.starts_with("Total Points Processed: 1\n"));
        assert!(!text.contains("Address Errors"));
    }
}
