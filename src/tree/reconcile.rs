//! Snapshot-to-tree reconciliation.
//!
//! Walks a [`Snapshot`] against the existing [`Forest`], matching records to
//! nodes by identity, updating matched nodes in place and appending new ones
//! in discovery order. Nothing is ever pruned.
//!
//! Identity is asymmetric:
//! - roots match on their last path segment only (`/Robot` matches any root
//!   whose nice name is `Robot`);
//! - every node below a root matches on its full path.
//!
//! Two walks are available (see [`ReconcileMode`]). Both keep the identity
//! rules above and both leave a record unplaced when its immediate parent has
//! no node yet.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use diagnostic_types::{Record, SEPARATOR};
use serde::{Deserialize, Serialize};

use super::{Forest, NodeId, TreeNode};
use crate::{ConfigError, Snapshot};

/// How descendants of a node are discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Single-pass depth-first walk: a node's descendant set is every record
    /// whose name starts with the node's path (plain string prefix). A
    /// non-matching descendant becomes a child only when the remainder after
    /// the node's path has at most two '/' components.
    Legacy,
    /// Parent-index walk: records are grouped by parent path once per cycle
    /// and each node only looks at records whose parent path is exactly its
    /// own. Prefix matching respects segment boundaries.
    #[default]
    Indexed,
}

impl ReconcileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileMode::Legacy => "legacy",
            ReconcileMode::Indexed => "indexed",
        }
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconcileMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ReconcileMode::Legacy),
            "indexed" => Ok(ReconcileMode::Indexed),
            _ => Err(ConfigError::InvalidValue {
                key: "reconcile_mode",
                value: s.to_string(),
            }),
        }
    }
}

/// New children appended under a node that existed before the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildrenAdded {
    pub parent: NodeId,
    /// Index of the first new child in the parent's children.
    pub first: usize,
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Indices of roots created this cycle.
    pub roots_added: Range<usize>,
    /// Children created under pre-existing nodes. Subtrees of newly created
    /// nodes are not listed separately.
    pub children_added: Vec<ChildrenAdded>,
    /// Number of node rebinds performed.
    pub updated: usize,
    /// Records with no node this cycle, in snapshot order.
    pub unplaced: Vec<String>,
}

impl ReconcileOutcome {
    pub fn new_root_count(&self) -> usize {
        self.roots_added.len()
    }
}

/// Keeps a [`Forest`] in sync with incoming snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeReconciler {
    mode: ReconcileMode,
}

impl TreeReconciler {
    pub fn new(mode: ReconcileMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Reconcile `forest` against `snapshot`.
    ///
    /// Root candidates are matched only against roots that existed before
    /// this pass; two top-level records sharing a last segment in one fresh
    /// snapshot become two roots.
    pub fn reconcile(&self, forest: &mut Forest, snapshot: &Snapshot) -> ReconcileOutcome {
        let mut cycle = Cycle::new(self.mode, snapshot, forest.next_id);
        let roots = &mut forest.roots;
        let existing = roots.len();

        for candidate in snapshot.top_level() {
            let nice = candidate.nice_name();
            let visit = match roots[..existing].iter().position(|r| r.nice_name() == nice) {
                Some(root) => Visit::root(root, candidate, false),
                None => {
                    roots.push(cycle.spawn(candidate));
                    Visit::root(roots.len() - 1, candidate, true)
                }
            };
            cycle.grow(roots, visit);
        }

        let roots_added = existing..roots.len();
        forest.next_id = cycle.next_id;
        cycle.finish(roots_added)
    }
}

/// A pending bind of one node, addressed by child indices from its root.
struct Visit<'s> {
    root: usize,
    route: Vec<usize>,
    record: &'s Record,
    /// Node created during this cycle; its children are reported as part of
    /// its own subtree rather than as additions.
    fresh: bool,
}

impl<'s> Visit<'s> {
    fn root(root: usize, record: &'s Record, fresh: bool) -> Self {
        Self {
            root,
            route: Vec::new(),
            record,
            fresh,
        }
    }

    fn child(&self, index: usize, record: &'s Record, fresh: bool) -> Self {
        let mut route = Vec::with_capacity(self.route.len() + 1);
        route.extend_from_slice(&self.route);
        route.push(index);
        Self {
            root: self.root,
            route,
            record,
            fresh,
        }
    }

    fn locate<'f>(&self, roots: &'f mut [TreeNode]) -> &'f mut TreeNode {
        let mut node = &mut roots[self.root];
        for &index in &self.route {
            node = &mut node.children[index];
        }
        node
    }
}

/// Working state for a single reconciliation pass.
struct Cycle<'s> {
    mode: ReconcileMode,
    snapshot: &'s Snapshot,
    by_parent: HashMap<&'s str, Vec<&'s Record>>,
    placed: HashSet<&'s str>,
    children_added: Vec<ChildrenAdded>,
    updated: usize,
    next_id: u64,
}

impl<'s> Cycle<'s> {
    fn new(mode: ReconcileMode, snapshot: &'s Snapshot, next_id: u64) -> Self {
        let mut by_parent: HashMap<&'s str, Vec<&'s Record>> = HashMap::new();
        if mode == ReconcileMode::Indexed {
            for record in snapshot.records() {
                by_parent.entry(record.parent_name()).or_default().push(record);
            }
        }
        Self {
            mode,
            snapshot,
            by_parent,
            placed: HashSet::with_capacity(snapshot.len()),
            children_added: Vec::new(),
            updated: 0,
            next_id,
        }
    }

    fn spawn(&mut self, record: &Record) -> TreeNode {
        TreeNode::new(NodeId::next(&mut self.next_id), record.clone())
    }

    /// Bind the visited node, match or create its children, then visit
    /// them depth-first. Runs on an explicit stack so tree depth is not
    /// limited by the thread's stack.
    fn grow(&mut self, roots: &mut [TreeNode], start: Visit<'s>) {
        let mut pending = vec![start];
        while let Some(visit) = pending.pop() {
            let node = visit.locate(roots);
            node.bind(visit.record);
            self.updated += 1;
            self.placed.insert(visit.record.name.as_str());

            let before = node.children.len();
            let candidates = match self.mode {
                ReconcileMode::Legacy => self.prefix_descendants(node),
                ReconcileMode::Indexed => self.indexed_children(node),
            };

            let mut next = Vec::new();
            for candidate in candidates {
                match node.child_position(&candidate.name) {
                    Some(pos) => next.push(visit.child(pos, candidate, false)),
                    None if self.may_adopt(node, candidate) => {
                        node.children.push(self.spawn(candidate));
                        next.push(visit.child(node.children.len() - 1, candidate, true));
                    }
                    None => {}
                }
            }

            if !visit.fresh && node.children.len() > before {
                self.children_added.push(ChildrenAdded {
                    parent: node.id,
                    first: before,
                });
            }
            pending.extend(next.into_iter().rev());
        }
    }

    /// Every record whose name has the node's path as a strict string prefix.
    fn prefix_descendants(&self, node: &TreeNode) -> Vec<&'s Record> {
        self.snapshot
            .records()
            .iter()
            .filter(|r| r.name.starts_with(node.name.as_str()) && r.name != node.name)
            .collect()
    }

    /// Records whose parent path is exactly the node's path.
    fn indexed_children(&self, node: &TreeNode) -> Vec<&'s Record> {
        self.by_parent
            .get(node.name.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Whether an unmatched candidate may become a new child of `node`.
    fn may_adopt(&self, node: &TreeNode, candidate: &Record) -> bool {
        match self.mode {
            ReconcileMode::Legacy => candidate
                .name
                .strip_prefix(node.name.as_str())
                .is_some_and(|rest| rest.split(SEPARATOR).count() <= 2),
            // Already restricted to immediate children.
            ReconcileMode::Indexed => true,
        }
    }

    fn finish(self, roots_added: Range<usize>) -> ReconcileOutcome {
        let unplaced = self
            .snapshot
            .records()
            .iter()
            .filter(|r| !self.placed.contains(r.name.as_str()))
            .map(|r| r.name.clone())
            .collect();
        ReconcileOutcome {
            roots_added,
            children_added: self.children_added,
            updated: self.updated,
            unplaced,
        }
    }
}
