//! Robot Monitor - diagnostics tree reconciliation.
//!
//! Ingests periodic flat snapshots of hierarchically-named status records and
//! maintains two derived views:
//! - a persistent [`Forest`] mirroring the namespace hierarchy, where node
//!   identity survives across cycles so observers can keep per-node state;
//! - a transient [`SeverityReport`] of errors and warnings, rebuilt every
//!   cycle.
//!
//! # Architecture
//!
//! ```text
//! SnapshotPublisher ──channel──> SnapshotSubscription
//!                                        │
//!                                        ▼
//!                                  RobotMonitor ──> DisplaySink
//!                                   │        │
//!                     SeverityClassifier   TreeReconciler
//!                                   │        │
//!                          SeverityReport   Forest ──> TreeNode ──> NodeObserver
//! ```
//!
//! # Example
//!
//! ```
//! use diagnostic_types::{Level, Record};
//! use robot_monitor::{MonitorConfig, RobotMonitor};
//!
//! let mut monitor = RobotMonitor::headless(MonitorConfig::default());
//! monitor
//!     .on_snapshot(vec![
//!         Record::new("/Robot", Level::Ok),
//!         Record::new("/Robot/Battery", Level::Warn).with_message("low"),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(monitor.forest().roots()[0].nice_name(), "Robot");
//! assert_eq!(monitor.severity().warnings, vec!["/Robot/Battery : low"]);
//! ```

pub mod channel;
pub mod config;
mod error;
pub mod inspect;
pub mod monitor;
mod severity;
mod snapshot;
pub mod tree;

// Re-exports
pub use channel::{snapshot_channel, PublisherStats, SnapshotPublisher, SnapshotSubscription};
pub use config::MonitorConfig;
pub use error::{ConfigError, MonitorError};
pub use inspect::{Inspector, StatusDetail};
pub use monitor::{CycleReport, CycleStats, DisplaySink, RobotMonitor};
pub use severity::{SeverityClassifier, SeverityReport};
pub use snapshot::Snapshot;
pub use tree::{Forest, NodeId, NodeObserver, ReconcileMode, TreeNode, TreeReconciler};
