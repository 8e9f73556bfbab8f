//! Headless per-node detail view.
//!
//! An [`Inspector`] is the data side of a node's detail panel: attach it to a
//! node and it tracks the node's latest record; [`Inspector::take_snapshot`]
//! freezes the current detail so it survives later updates.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use diagnostic_types::Record;
use serde::{Deserialize, Serialize};

use crate::tree::NodeObserver;

/// Ordered key/value lines describing one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetail {
    /// Header lines: full name, component, hardware id, level, message
    pub header: Vec<(String, String)>,
    /// The record's own detail pairs, in order
    pub values: Vec<(String, String)>,
}

impl StatusDetail {
    pub fn from_record(record: &Record) -> Self {
        let header = vec![
            ("Full Name".to_string(), record.name.clone()),
            ("Component".to_string(), record.nice_name().to_string()),
            ("Hardware ID".to_string(), record.hardware_id.clone()),
            ("Level".to_string(), record.level.to_string()),
            ("Message".to_string(), record.message.clone()),
        ];
        let values = record
            .values
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect();
        Self { header, values }
    }

    /// Look up a line by key (header first, then values).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.header
            .iter()
            .chain(self.values.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for StatusDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.header {
            writeln!(f, "{key}: {value}")?;
        }
        writeln!(f)?;
        for (key, value) in &self.values {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct InspectorState {
    current: StatusDetail,
    updates: u64,
    frozen: Vec<StatusDetail>,
}

/// Detail view for a single node, fed through [`NodeObserver`].
#[derive(Debug)]
pub struct Inspector {
    title: String,
    state: Mutex<InspectorState>,
}

impl Inspector {
    /// Open an inspector showing `record`.
    pub fn new(record: &Record) -> Arc<Self> {
        Arc::new(Self {
            title: record.name.clone(),
            state: Mutex::new(InspectorState {
                current: StatusDetail::from_record(record),
                updates: 0,
                frozen: Vec::new(),
            }),
        })
    }

    /// Full name of the node the inspector was opened on.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn detail(&self) -> StatusDetail {
        self.state().current.clone()
    }

    /// Updates received since the inspector was opened.
    pub fn update_count(&self) -> u64 {
        self.state().updates
    }

    /// Freeze the current detail and return it.
    pub fn take_snapshot(&self) -> StatusDetail {
        let mut state = self.state();
        let frozen = state.current.clone();
        state.frozen.push(frozen.clone());
        frozen
    }

    /// Frozen details, oldest first.
    pub fn snapshots(&self) -> Vec<StatusDetail> {
        self.state().frozen.clone()
    }

    fn state(&self) -> MutexGuard<'_, InspectorState> {
        // A panic in another holder leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NodeObserver for Inspector {
    fn status_updated(&self, record: &Record) {
        let mut state = self.state();
        state.current = StatusDetail::from_record(record);
        state.updates += 1;
    }
}
