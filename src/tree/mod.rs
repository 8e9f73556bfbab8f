//! Persistent status tree.
//!
//! One [`TreeNode`] exists per distinct namespace path for the lifetime of the
//! [`Forest`]. Nodes are updated in place every cycle and never removed, so an
//! observer attached to a node keeps receiving updates across cycles.
//!
//! ```text
//! Forest
//! ├── /Robot            (root: one separator)
//! │   ├── /Robot/Battery
//! │   └── /Robot/Drive
//! │       └── /Robot/Drive/Left
//! └── /Sensors
//! ```

pub mod reconcile;

use std::fmt;
use std::sync::{Arc, Weak};

use diagnostic_types::{KeyValue, Level, Record};
use serde::{Deserialize, Serialize};

pub use reconcile::{ChildrenAdded, ReconcileMode, ReconcileOutcome, TreeReconciler};

/// Forest-unique node identifier, stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Take the next id from a forest counter.
    fn next(counter: &mut u64) -> Self {
        let id = NodeId(*counter);
        *counter += 1;
        id
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Externally owned per-node view (e.g. an open detail panel).
///
/// The tree only holds a weak handle; dropping the last strong reference
/// detaches the observer.
pub trait NodeObserver: Send + Sync {
    /// Called each time the node is rebound to a fresh record.
    fn status_updated(&self, record: &Record);
}

/// A node of the status tree.
pub struct TreeNode {
    id: NodeId,
    name: String,
    record: Record,
    children: Vec<TreeNode>,
    observer: Option<Weak<dyn NodeObserver>>,
}

impl TreeNode {
    fn new(id: NodeId, record: Record) -> Self {
        Self {
            id,
            name: record.name.clone(),
            record,
            children: Vec::new(),
            observer: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Full path, fixed when the node was created.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of [`name`](Self::name).
    pub fn nice_name(&self) -> &str {
        diagnostic_types::nice_name(&self.name)
    }

    /// Most recently bound record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn level(&self) -> Level {
        self.record.level
    }

    pub fn message(&self) -> &str {
        &self.record.message
    }

    pub fn hardware_id(&self) -> &str {
        &self.record.hardware_id
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.record.values
    }

    /// Children in first-discovery order.
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Attach an observer. Replaces any observer already attached.
    pub fn attach_observer(&mut self, observer: &Arc<dyn NodeObserver>) {
        self.observer = Some(Arc::downgrade(observer));
    }

    pub fn detach_observer(&mut self) {
        self.observer = None;
    }

    /// True while an attached observer is still alive.
    pub fn has_observer(&self) -> bool {
        self.observer
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Rebind to `record` and forward it to the observer, if any.
    fn bind(&mut self, record: &Record) {
        self.record = record.clone();
        if self.observer.is_none() {
            return;
        }
        match self.observer.as_ref().and_then(Weak::upgrade) {
            Some(observer) => observer.status_updated(&self.record),
            None => self.observer = None,
        }
    }

    fn child_position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }

    /// Find a node in this subtree by id.
    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        self.descendants().map(|(_, n)| n).find(|n| n.id == id)
    }

    /// Find a node in this subtree by full path.
    pub fn find_path(&self, path: &str) -> Option<&TreeNode> {
        self.descendants().map(|(_, n)| n).find(|n| n.name == path)
    }

    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        let route = self.route_to(|n| n.name == path)?;
        let mut node = self;
        for index in route {
            node = &mut node.children[index];
        }
        Some(node)
    }

    /// Depth-first walk of this subtree in discovery order, with depth
    /// (0 = this node).
    pub fn walk(&self) -> Vec<(usize, &TreeNode)> {
        self.descendants().collect()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        self.descendants().count()
    }

    fn descendants(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// Child indices leading from this node to the first match, pre-order.
    fn route_to(&self, matches: impl Fn(&TreeNode) -> bool) -> Option<Vec<usize>> {
        let mut route = Vec::new();
        let mut stack = vec![(0usize, 0usize, self)];
        while let Some((depth, index, node)) = stack.pop() {
            if depth > 0 {
                route.truncate(depth - 1);
                route.push(index);
            }
            if matches(node) {
                return Some(route);
            }
            stack.extend(
                node.children
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, child)| (depth + 1, i, child)),
            );
        }
        None
    }
}

/// Pre-order traversal on an explicit stack; tree depth is unbounded.
struct Walk<'a> {
    stack: Vec<(usize, &'a TreeNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        // Flatten before dropping so deep chains do not recurse.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("level", &self.record.level)
            .field("observed", &self.has_observer())
            .field("children", &self.children.len())
            .finish()
    }
}

/// Root nodes plus the id allocator for every node ever created in them.
#[derive(Debug, Default)]
pub struct Forest {
    roots: Vec<TreeNode>,
    next_id: u64,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots in first-discovery order.
    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.roots.iter().map(TreeNode::node_count).sum()
    }

    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        self.roots.iter().find_map(|r| r.find(id))
    }

    pub fn find_path(&self, path: &str) -> Option<&TreeNode> {
        self.roots.iter().find_map(|r| r.find_path(path))
    }

    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        self.roots.iter_mut().find_map(|r| r.find_path_mut(path))
    }

    /// Full paths of every node, depth-first in discovery order.
    pub fn paths(&self) -> Vec<String> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node.name.clone())
            .collect()
    }

    /// Depth-first walk over all roots.
    pub fn walk(&self) -> Vec<(usize, &TreeNode)> {
        self.roots.iter().flat_map(TreeNode::walk).collect()
    }

    #[cfg(test)]
    fn allocate(&mut self, record: &Record) -> TreeNode {
        TreeNode::new(NodeId::next(&mut self.next_id), record.clone())
    }
}
