//! Monitor error types.
//!
//! A rejected snapshot is never fatal: the monitor logs it, keeps the previous
//! tree and severity view, and waits for the next one.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while accepting a snapshot.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A record name is empty or has no '/' separator.
    #[error("Malformed record at index {index}: name '{name}' is empty or has no '/' separator")]
    MalformedRecord {
        /// Offending name (may be empty).
        name: String,
        /// Position of the record in the snapshot.
        index: usize,
    },

    /// Two records in one snapshot share a name.
    #[error("Duplicate record name in snapshot: '{name}'")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// The snapshot payload could not be decoded.
    #[error("Snapshot decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl MonitorError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::DuplicateName { .. } => "DUPLICATE_NAME",
            Self::Decode(_) => "DECODE_FAILED",
        }
    }
}

/// Errors raised while loading a [`MonitorConfig`](crate::MonitorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ",
            Self::Yaml(_) => "CONFIG_YAML",
            Self::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        let err = MonitorError::MalformedRecord {
            name: String::new(),
            index: 0,
        };
        assert_eq!(err.code(), "MALFORMED_RECORD");

        let err = MonitorError::DuplicateName {
            name: "/Robot".into(),
        };
        assert_eq!(err.code(), "DUPLICATE_NAME");
    }

    #[test]
    fn error_display() {
        let err = MonitorError::MalformedRecord {
            name: "Robot".into(),
            index: 3,
        };
        let text = err.to_string();
        assert!(text.contains("index 3"));
        assert!(text.contains("'Robot'"));

        let err = ConfigError::InvalidValue {
            key: "reconcile_mode",
            value: "sideways".into(),
        };
        assert!(err.to_string().contains("sideways"));
    }
}
