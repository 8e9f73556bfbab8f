//! Per-cycle severity bucketing.
//!
//! Stateless: every cycle produces fresh error and warning lists which fully
//! replace the previous ones.

use diagnostic_types::{Level, Record};
use serde::{Deserialize, Serialize};

use crate::Snapshot;

/// Error and warning lines for one cycle, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SeverityReport {
    pub fn clear(&mut self) {
        self.errors.clear();
        self.warnings.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Classifies records into error and warning buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityClassifier;

impl SeverityClassifier {
    /// Bucket every ERROR and WARN record; OK and STALE produce nothing.
    pub fn classify(snapshot: &Snapshot) -> SeverityReport {
        let mut report = SeverityReport::default();
        for record in snapshot.records() {
            match record.level {
                Level::Error => report.errors.push(format_line(record)),
                Level::Warn => report.warnings.push(format_line(record)),
                Level::Ok | Level::Stale => {}
            }
        }
        report
    }
}

/// `"{name} : {message}"`
pub fn format_line(record: &Record) -> String {
    format!("{} : {}", record.name, record.message)
}
