//! Diagnostic Types - Level 1 Foundation Types
//!
//! Pure data structures for hierarchically-named status records. A record's
//! name is a '/'-delimited path encoding its position in the logical
//! component tree, e.g. `/Robot/Battery`.
//!
//! ## Contents
//!
//! - Status levels (`Level`) with their wire codes
//! - Key/value detail pairs (`KeyValue`)
//! - Status records (`Record`) and their path accessors
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - Only data structures
//! 2. **NO FUNCTIONS** - Except basic constructors and accessors
//! 3. **NO WORKSPACE DEPENDENCIES** - Cannot depend on other workspace crates
//! 4. **SERIALIZABLE** - All types must support serde

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path separator used in record names.
pub const SEPARATOR: char = '/';

// ============================================================================
// STATUS LEVEL
// ============================================================================

/// Status level reported by a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Component is healthy
    #[default]
    Ok,
    /// Component is degraded
    Warn,
    /// Component has failed
    Error,
    /// No recent report from the component
    Stale,
}

/// Unknown numeric level code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown status level code: {0}")]
pub struct LevelCodeError(pub u8);

impl Level {
    /// Decode a wire code (0 = OK, 1 = WARN, 2 = ERROR, 3 = STALE).
    pub fn from_code(code: u8) -> Result<Self, LevelCodeError> {
        match code {
            0 => Ok(Level::Ok),
            1 => Ok(Level::Warn),
            2 => Ok(Level::Error),
            3 => Ok(Level::Stale),
            other => Err(LevelCodeError(other)),
        }
    }

    /// Wire code for this level.
    pub fn code(&self) -> u8 {
        match self {
            Level::Ok => 0,
            Level::Warn => 1,
            Level::Error => 2,
            Level::Stale => 3,
        }
    }

    /// Get human-readable level name
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Stale => "STALE",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// KEY / VALUE DETAIL
// ============================================================================

/// One detail pair attached to a record (e.g. `Voltage` = `11.8`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// STATUS RECORD
// ============================================================================

/// Immutable status record decoded from one entry of an incoming snapshot.
///
/// Two records are equal when their names are equal; within one snapshot the
/// name is the record's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Full namespace path, e.g. `/Robot/Battery`
    pub name: String,
    /// Reported status level
    pub level: Level,
    /// Free-text status message
    #[serde(default)]
    pub message: String,
    /// Free-text hardware identifier (may be empty)
    #[serde(default)]
    pub hardware_id: String,
    /// Ordered detail pairs
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

impl Record {
    /// Create a record with an empty message, hardware id and value list
    pub fn new(name: impl Into<String>, level: Level) -> Self {
        Self {
            name: name.into(),
            level,
            message: String::new(),
            hardware_id: String::new(),
            values: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_hardware_id(mut self, hardware_id: impl Into<String>) -> Self {
        self.hardware_id = hardware_id.into();
        self
    }

    /// Append a detail pair
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push(KeyValue::new(key, value));
        self
    }

    /// Last '/'-delimited segment of the name (display only).
    pub fn nice_name(&self) -> &str {
        nice_name(&self.name)
    }

    /// Everything before the last '/' (empty for `/Robot`).
    pub fn parent_name(&self) -> &str {
        parent_name(&self.name)
    }

    /// Number of '/'-separated components; `/Robot` has two.
    pub fn segments(&self) -> usize {
        self.name.split(SEPARATOR).count()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Record {}

/// Last '/'-delimited segment of a path.
pub fn nice_name(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Everything before the last '/' of a path.
pub fn parent_name(path: &str) -> &str {
    path.rsplit_once(SEPARATOR)
        .map(|(parent, _)| parent)
        .unwrap_or("")
}
