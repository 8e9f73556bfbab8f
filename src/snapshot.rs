//! Validated status snapshots.
//!
//! A [`Snapshot`] is one atomic delivery of every currently known record. It
//! can only be built through validation, so holding one means the names are
//! well-formed and unique.

use std::collections::HashSet;

use diagnostic_types::{Record, SEPARATOR};
use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Ordered, validated sequence of records received as one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Record>", into = "Vec<Record>")]
pub struct Snapshot {
    records: Vec<Record>,
}

impl Snapshot {
    /// Validate `records` and wrap them.
    ///
    /// Rejects the whole batch on the first empty or separator-free name, or
    /// on the first repeated name.
    pub fn new(records: Vec<Record>) -> Result<Self, MonitorError> {
        let mut seen = HashSet::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.name.is_empty() || !record.name.contains(SEPARATOR) {
                return Err(MonitorError::MalformedRecord {
                    name: record.name.clone(),
                    index,
                });
            }
            if !seen.insert(record.name.as_str()) {
                return Err(MonitorError::DuplicateName {
                    name: record.name.clone(),
                });
            }
        }
        Ok(Self { records })
    }

    /// Decode a JSON array of records and validate it.
    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        Self::new(records)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records hanging directly off the global root (exactly one separator).
    pub fn top_level(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| is_top_level(&r.name))
    }

    /// Look up a record by full name.
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<Record>> for Snapshot {
    type Error = MonitorError;

    fn try_from(records: Vec<Record>) -> Result<Self, Self::Error> {
        Self::new(records)
    }
}

impl From<Snapshot> for Vec<Record> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.records
    }
}

/// A name is a root candidate iff it splits into exactly two components.
pub(crate) fn is_top_level(name: &str) -> bool {
    name.split(SEPARATOR).count() == 2
}
