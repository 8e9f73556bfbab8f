//! Monitor configuration.
//!
//! Loaded from defaults, a YAML file, or `ROBOT_MONITOR_*` environment
//! variables:
//!   ROBOT_MONITOR_TOPIC              subscription topic (default: /diagnostics)
//!   ROBOT_MONITOR_CHANNEL_CAPACITY   inbound buffer size in snapshots (default: 16)
//!   ROBOT_MONITOR_RECONCILE_MODE     `indexed` or `legacy` (default: indexed)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tree::ReconcileMode;
use crate::ConfigError;

pub const ENV_TOPIC: &str = "ROBOT_MONITOR_TOPIC";
pub const ENV_CHANNEL_CAPACITY: &str = "ROBOT_MONITOR_CHANNEL_CAPACITY";
pub const ENV_RECONCILE_MODE: &str = "ROBOT_MONITOR_RECONCILE_MODE";

/// Configuration for a [`RobotMonitor`](crate::RobotMonitor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Topic the monitor subscribes to.
    pub topic: String,

    /// Inbound buffer size, in snapshots.
    ///
    /// Snapshots are complete state, so a small buffer is enough; a full
    /// buffer drops the newest delivery.
    pub channel_capacity: usize,

    /// Tree reconciliation walk.
    pub reconcile_mode: ReconcileMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            topic: "/diagnostics".to_string(),
            channel_capacity: 16,
            reconcile_mode: ReconcileMode::default(),
        }
    }
}

impl MonitorConfig {
    /// Defaults overridden by any `ROBOT_MONITOR_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (usually the process environment).
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(topic) = lookup(ENV_TOPIC) {
            self.topic = topic;
        }
        if let Some(raw) = lookup(ENV_CHANNEL_CAPACITY) {
            self.channel_capacity = parse_capacity(&raw)?;
        }
        if let Some(raw) = lookup(ENV_RECONCILE_MODE) {
            self.reconcile_mode = raw.parse()?;
        }
        Ok(self)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validated()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Set the subscription topic.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the inbound buffer size.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the reconciliation walk.
    pub fn reconcile_mode(mut self, mode: ReconcileMode) -> Self {
        self.reconcile_mode = mode;
        self
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "channel_capacity",
                value: "0".to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_capacity(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: "channel_capacity",
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.topic, "/diagnostics");
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.reconcile_mode, ReconcileMode::Indexed);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MonitorConfig::default()
            .topic("/diagnostics_agg")
            .channel_capacity(4)
            .reconcile_mode(ReconcileMode::Legacy);

        assert_eq!(config.topic, "/diagnostics_agg");
        assert_eq!(config.channel_capacity, 4);
        assert_eq!(config.reconcile_mode, ReconcileMode::Legacy);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TOPIC, "/robot/diagnostics"),
            (ENV_CHANNEL_CAPACITY, "32"),
            (ENV_RECONCILE_MODE, "legacy"),
        ]
        .into_iter()
        .collect();

        let config = MonitorConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.topic, "/robot/diagnostics");
        assert_eq!(config.channel_capacity, 32);
        assert_eq!(config.reconcile_mode, ReconcileMode::Legacy);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = MonitorConfig::default()
            .with_env_overrides(|key| (key == ENV_CHANNEL_CAPACITY).then(|| "0".to_string()))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_VALUE");

        let err = MonitorConfig::default()
            .with_env_overrides(|key| (key == ENV_RECONCILE_MODE).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = MonitorConfig::from_yaml_str("reconcile_mode: legacy\n").unwrap();
        assert_eq!(config.reconcile_mode, ReconcileMode::Legacy);
        assert_eq!(config.topic, "/diagnostics");

        let err = MonitorConfig::from_yaml_str("channel_capacity: 0\n").unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_VALUE");
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "topic: /diag\nchannel_capacity: 2").unwrap();

        let config = MonitorConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.topic, "/diag");
        assert_eq!(config.channel_capacity, 2);

        let err = MonitorConfig::from_yaml_file("/nonexistent/monitor.yaml").unwrap_err();
        assert_eq!(err.code(), "CONFIG_READ");
    }
}
