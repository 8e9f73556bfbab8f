//! The monitor controller.
//!
//! One cycle per snapshot, fully completed before the next is accepted:
//!
//! 1. validate (a rejected snapshot changes nothing)
//! 2. clear the transient severity view
//! 3. classify and publish errors / warnings
//! 4. reconcile the persistent forest and publish new nodes
//!
//! All work is synchronous; the only blocking call is [`RobotMonitor::run`],
//! which waits on the inbound subscription.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use diagnostic_types::Record;
use tracing::{debug, info, warn};

use crate::channel::{RawSnapshot, SnapshotSubscription};
use crate::inspect::Inspector;
use crate::severity::{SeverityClassifier, SeverityReport};
use crate::tree::{Forest, NodeObserver, ReconcileOutcome, TreeNode, TreeReconciler};
use crate::{MonitorConfig, MonitorError, Snapshot};

/// Display collaborator notified of every visible change.
///
/// Existing nodes are updated in place and are not re-announced; the sink
/// reads their new state through the [`TreeNode`] accessors.
pub trait DisplaySink {
    /// Roots created this cycle, in discovery order, with their subtrees.
    fn roots_added(&mut self, roots: &[TreeNode]);

    /// Children created this cycle under a node that already existed.
    fn children_added(&mut self, _parent: &TreeNode, _children: &[TreeNode]) {}

    /// The previous cycle's error and warning lists are gone.
    fn severity_cleared(&mut self) {}

    fn errors_replaced(&mut self, errors: &[String]);

    fn warnings_replaced(&mut self, warnings: &[String]);
}

/// Headless monitor: no display.
impl DisplaySink for () {
    fn roots_added(&mut self, _roots: &[TreeNode]) {}
    fn errors_replaced(&mut self, _errors: &[String]) {}
    fn warnings_replaced(&mut self, _warnings: &[String]) {}
}

/// Summary of one applied cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub received_at: DateTime<Utc>,
    pub records: usize,
    pub roots_added: usize,
    pub children_added: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Records whose parent node does not exist yet.
    pub unplaced: Vec<String>,
}

/// Counters across the monitor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub applied: u64,
    pub rejected: u64,
}

/// Maintains the status tree and severity view from a stream of snapshots.
pub struct RobotMonitor<D: DisplaySink = ()> {
    config: MonitorConfig,
    forest: Forest,
    reconciler: TreeReconciler,
    severity: SeverityReport,
    display: D,
    subscription: Option<SnapshotSubscription>,
    stats: CycleStats,
}

impl RobotMonitor<()> {
    /// A monitor without a display collaborator.
    pub fn headless(config: MonitorConfig) -> Self {
        Self::new(config, ())
    }
}

impl<D: DisplaySink> RobotMonitor<D> {
    pub fn new(config: MonitorConfig, display: D) -> Self {
        let reconciler = TreeReconciler::new(config.reconcile_mode);
        Self {
            config,
            forest: Forest::new(),
            reconciler,
            severity: SeverityReport::default(),
            display,
            subscription: None,
            stats: CycleStats::default(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Current cycle's error and warning lists.
    pub fn severity(&self) -> &SeverityReport {
        &self.severity
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Start consuming `subscription`, replacing any current one.
    pub fn subscribe(&mut self, subscription: SnapshotSubscription) {
        info!(topic = subscription.topic(), "Subscribed to snapshots");
        self.subscription = Some(subscription);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Entry point for one delivery: validate, then apply.
    ///
    /// A malformed batch is logged and rejected wholesale; the previous tree
    /// and severity view stay as they were.
    pub fn on_snapshot(&mut self, records: RawSnapshot) -> Result<CycleReport, MonitorError> {
        match Snapshot::new(records) {
            Ok(snapshot) => Ok(self.apply(&snapshot)),
            Err(e) => {
                self.stats.rejected += 1;
                warn!(error = %e, code = e.code(), "Rejected snapshot");
                Err(e)
            }
        }
    }

    /// Run one cycle on an already validated snapshot.
    pub fn apply(&mut self, snapshot: &Snapshot) -> CycleReport {
        let received_at = Utc::now();

        self.severity.clear();
        self.display.severity_cleared();

        self.severity = SeverityClassifier::classify(snapshot);
        self.display.errors_replaced(&self.severity.errors);
        self.display.warnings_replaced(&self.severity.warnings);

        let outcome = self.reconciler.reconcile(&mut self.forest, snapshot);
        self.publish_new_nodes(&outcome);

        if !outcome.unplaced.is_empty() {
            warn!(
                count = outcome.unplaced.len(),
                first = %outcome.unplaced[0],
                "Records without a parent node this cycle"
            );
        }

        self.stats.applied += 1;
        let report = CycleReport {
            received_at,
            records: snapshot.len(),
            roots_added: outcome.new_root_count(),
            children_added: outcome.children_added.len(),
            errors: self.severity.errors.len(),
            warnings: self.severity.warnings.len(),
            unplaced: outcome.unplaced,
        };
        debug!(
            records = report.records,
            roots_added = report.roots_added,
            children_added = report.children_added,
            updated = outcome.updated,
            errors = report.errors,
            warnings = report.warnings,
            "Snapshot applied"
        );
        report
    }

    fn publish_new_nodes(&mut self, outcome: &ReconcileOutcome) {
        let roots = &self.forest.roots()[outcome.roots_added.clone()];
        if !roots.is_empty() {
            for root in roots {
                info!(root = root.name(), nodes = root.node_count(), "New root");
            }
            self.display.roots_added(roots);
        }
        for added in &outcome.children_added {
            if let Some(parent) = self.forest.find(added.parent) {
                self.display
                    .children_added(parent, &parent.children()[added.first..]);
            }
        }
    }

    /// Apply every pending delivery without blocking. Returns how many were
    /// received (applied or rejected).
    pub fn poll(&mut self) -> usize {
        let mut received = 0;
        while let Some(records) = self.subscription.as_ref().and_then(|s| s.try_recv()) {
            received += 1;
            // Rejections are logged and counted in on_snapshot.
            let _ = self.on_snapshot(records);
        }
        received
    }

    /// Process deliveries until every publisher has disconnected, then drop
    /// the subscription.
    pub fn run(&mut self) {
        while let Some(records) = self.subscription.as_ref().and_then(|s| s.recv()) {
            let _ = self.on_snapshot(records);
        }
        if self.subscription.take().is_some() {
            info!("Snapshot publisher disconnected");
        }
    }

    /// Unsubscribe from the inbound channel. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            info!(topic = subscription.topic(), "Monitor closed");
        }
    }

    /// Attach a fresh [`Inspector`] to the node at `path`.
    ///
    /// The caller owns the returned inspector; dropping it detaches it.
    pub fn open_inspector(&mut self, path: &str) -> Option<Arc<Inspector>> {
        let node = self.forest.find_path_mut(path)?;
        let inspector = Inspector::new(node.record());
        let observer: Arc<dyn NodeObserver> = inspector.clone();
        node.attach_observer(&observer);
        Some(inspector)
    }

    /// Detach whatever observer is attached to the node at `path`.
    pub fn close_inspector(&mut self, path: &str) -> bool {
        match self.forest.find_path_mut(path) {
            Some(node) => {
                node.detach_observer();
                true
            }
            None => false,
        }
    }

    /// Attach an arbitrary observer to the node at `path`.
    pub fn attach_observer(&mut self, path: &str, observer: &Arc<dyn NodeObserver>) -> bool {
        match self.forest.find_path_mut(path) {
            Some(node) => {
                node.attach_observer(observer);
                true
            }
            None => false,
        }
    }

    /// Records currently bound to the tree, depth-first.
    pub fn records(&self) -> Vec<&Record> {
        self.forest
            .walk()
            .into_iter()
            .map(|(_, node)| node.record())
            .collect()
    }
}
