//! Cross-cycle behaviour of the monitor: node identity, idempotence,
//! monotonic growth and severity replacement.

use diagnostic_types::{Level, Record};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use robot_monitor::{
    Forest, MonitorConfig, NodeId, ReconcileMode, RobotMonitor, Snapshot, TreeReconciler,
};

fn monitor(mode: ReconcileMode) -> RobotMonitor {
    RobotMonitor::headless(MonitorConfig::default().reconcile_mode(mode))
}

fn modes() -> [ReconcileMode; 2] {
    [ReconcileMode::Legacy, ReconcileMode::Indexed]
}

fn root_ids(monitor: &RobotMonitor) -> Vec<NodeId> {
    monitor.forest().roots().iter().map(|r| r.id()).collect()
}

/// Shape and content of a forest: (depth, path, level, message) per node.
fn shape(forest: &Forest) -> Vec<(usize, String, Level, String)> {
    forest
        .walk()
        .into_iter()
        .map(|(depth, node)| {
            (
                depth,
                node.name().to_string(),
                node.level(),
                node.message().to_string(),
            )
        })
        .collect()
}

#[test]
fn robot_battery_warning_scenario() {
    for mode in modes() {
        let mut monitor = monitor(mode);
        monitor
            .on_snapshot(vec![
                Record::new("/Robot", Level::Ok),
                Record::new("/Robot/Battery", Level::Warn).with_message("low"),
            ])
            .unwrap();

        let roots = monitor.forest().roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].nice_name(), "Robot");
        assert_eq!(roots[0].children().len(), 1);
        assert_eq!(roots[0].children()[0].nice_name(), "Battery");
        assert_eq!(monitor.severity().warnings, vec!["/Robot/Battery : low"]);
        assert!(monitor.severity().errors.is_empty());
    }
}

#[test]
fn robot_battery_escalates_to_error_without_duplication() {
    for mode in modes() {
        let mut monitor = monitor(mode);
        monitor
            .on_snapshot(vec![
                Record::new("/Robot", Level::Ok),
                Record::new("/Robot/Battery", Level::Warn).with_message("low"),
            ])
            .unwrap();
        let robot_id = monitor.forest().roots()[0].id();
        let battery_id = monitor.forest().roots()[0].children()[0].id();

        monitor
            .on_snapshot(vec![
                Record::new("/Robot", Level::Ok),
                Record::new("/Robot/Battery", Level::Error).with_message("critical"),
            ])
            .unwrap();

        assert_eq!(monitor.forest().node_count(), 2);
        let robot = &monitor.forest().roots()[0];
        let battery = &robot.children()[0];
        assert_eq!(robot.id(), robot_id);
        assert_eq!(battery.id(), battery_id);
        assert_eq!(battery.level(), Level::Error);
        assert_eq!(
            monitor.severity().errors,
            vec!["/Robot/Battery : critical"]
        );
        assert!(monitor.severity().warnings.is_empty());
    }
}

#[test]
fn severity_lists_are_replaced_each_cycle() {
    let mut monitor = monitor(ReconcileMode::default());
    monitor
        .on_snapshot(vec![
            Record::new("/Robot", Level::Ok),
            Record::new("/Robot/Motor", Level::Error).with_message("stalled"),
        ])
        .unwrap();
    assert_eq!(monitor.severity().errors.len(), 1);

    monitor
        .on_snapshot(vec![
            Record::new("/Robot", Level::Ok),
            Record::new("/Robot/Motor", Level::Ok),
        ])
        .unwrap();
    assert!(monitor.severity().errors.is_empty());
    assert!(monitor.severity().warnings.is_empty());
}

#[test]
fn leaf_appears_once_its_parent_is_reported() {
    for mode in modes() {
        let mut monitor = monitor(mode);
        let report = monitor
            .on_snapshot(vec![Record::new("/A/leaf", Level::Ok)])
            .unwrap();
        assert!(monitor.forest().find_path("/A/leaf").is_none());
        assert_eq!(report.unplaced, vec!["/A/leaf"]);

        monitor
            .on_snapshot(vec![
                Record::new("/A", Level::Ok),
                Record::new("/A/leaf", Level::Ok),
            ])
            .unwrap();
        assert!(monitor.forest().find_path("/A/leaf").is_some());
    }
}

#[test]
fn new_root_adds_exactly_one_node_and_keeps_existing() {
    for mode in modes() {
        let mut monitor = monitor(mode);
        monitor
            .on_snapshot(vec![
                Record::new("/Robot", Level::Ok),
                Record::new("/Sensors", Level::Ok),
            ])
            .unwrap();
        let before = root_ids(&monitor);

        let report = monitor
            .on_snapshot(vec![
                Record::new("/Sensors", Level::Warn),
                Record::new("/Arm", Level::Ok),
                Record::new("/Robot", Level::Ok),
            ])
            .unwrap();

        let after = root_ids(&monitor);
        assert_eq!(report.roots_added, 1);
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
    }
}

#[test]
fn rejected_snapshot_produces_no_visible_change() {
    let mut monitor = monitor(ReconcileMode::default());
    monitor
        .on_snapshot(vec![
            Record::new("/Robot", Level::Ok),
            Record::new("/Robot/Battery", Level::Warn).with_message("low"),
        ])
        .unwrap();
    let before = shape(monitor.forest());

    assert!(monitor
        .on_snapshot(vec![
            Record::new("/Robot", Level::Error),
            Record::new("Battery", Level::Error),
        ])
        .is_err());

    assert_eq!(shape(monitor.forest()), before);
    assert_eq!(monitor.severity().warnings, vec!["/Robot/Battery : low"]);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn arb_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::Ok),
        Just(Level::Warn),
        Just(Level::Error),
        Just(Level::Stale),
    ]
}

/// Paths one to three segments deep over a small alphabet, so parents and
/// children collide often.
fn arb_path() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 1..=3)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_set(arb_path(), 0..12)
        .prop_flat_map(|paths| {
            let paths: Vec<String> = paths.into_iter().collect();
            let n = paths.len();
            (
                Just(paths).prop_shuffle(),
                prop::collection::vec(arb_level(), n),
            )
        })
        .prop_map(|(paths, levels)| {
            let records = paths
                .into_iter()
                .zip(levels)
                .map(|(path, level)| {
                    let message = format!("{path} is {level}");
                    Record::new(path, level).with_message(message)
                })
                .collect();
            Snapshot::new(records).expect("generated names are unique and well-formed")
        })
}

fn arb_mode() -> impl Strategy<Value = ReconcileMode> {
    prop_oneof![Just(ReconcileMode::Legacy), Just(ReconcileMode::Indexed)]
}

proptest! {
    #[test]
    fn applying_twice_equals_applying_once(mode in arb_mode(), snapshot in arb_snapshot()) {
        let reconciler = TreeReconciler::new(mode);
        let mut forest = Forest::new();
        reconciler.reconcile(&mut forest, &snapshot);
        let once = shape(&forest);

        let outcome = reconciler.reconcile(&mut forest, &snapshot);
        prop_assert_eq!(shape(&forest), once);
        prop_assert_eq!(outcome.new_root_count(), 0);
        prop_assert!(outcome.children_added.is_empty());
    }

    #[test]
    fn node_paths_never_disappear(
        mode in arb_mode(),
        first in arb_snapshot(),
        second in arb_snapshot(),
    ) {
        let reconciler = TreeReconciler::new(mode);
        let mut forest = Forest::new();
        reconciler.reconcile(&mut forest, &first);
        let before = forest.paths();
        let ids_before: Vec<NodeId> = forest.walk().iter().map(|(_, n)| n.id()).collect();

        reconciler.reconcile(&mut forest, &second);
        let after = forest.paths();
        for path in &before {
            prop_assert!(after.contains(path), "{} disappeared", path);
        }
        for id in ids_before {
            prop_assert!(forest.find(id).is_some(), "node {} was replaced", id);
        }
    }

    #[test]
    fn indexed_tree_follows_parent_paths(snapshot in arb_snapshot()) {
        let mut forest = Forest::new();
        TreeReconciler::new(ReconcileMode::Indexed).reconcile(&mut forest, &snapshot);

        for (_, node) in forest.walk() {
            for child in node.children() {
                prop_assert_eq!(diagnostic_types::parent_name(child.name()), node.name());
            }
        }
    }

    #[test]
    fn modes_agree_on_single_letter_paths(snapshot in arb_snapshot()) {
        // Single-letter segments never share a string prefix without sharing
        // a path segment, so both walks must build the same tree.
        let mut legacy = Forest::new();
        let mut indexed = Forest::new();
        TreeReconciler::new(ReconcileMode::Legacy).reconcile(&mut legacy, &snapshot);
        TreeReconciler::new(ReconcileMode::Indexed).reconcile(&mut indexed, &snapshot);
        prop_assert_eq!(shape(&legacy), shape(&indexed));
    }
}
