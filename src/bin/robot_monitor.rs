//! Robot Monitor Command Line Interface
//!
//! Replays recorded snapshot logs through the monitor. A log is JSON Lines:
//! each line is one snapshot, a JSON array of status records.
//!
//! # Usage
//!
//! ```bash
//! # Replay a log, printing display events, the final tree and severity lists
//! robot_monitor replay --file diagnostics.jsonl
//!
//! # Follow one node's detail view while replaying
//! robot_monitor replay --file diagnostics.jsonl --inspect /Robot/Battery
//!
//! # Validate a log without applying it
//! robot_monitor check --file diagnostics.jsonl
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use diagnostic_types::{Level, Record};
use robot_monitor::{
    snapshot_channel, DisplaySink, MonitorConfig, ReconcileMode, RobotMonitor, Snapshot,
    TreeNode,
};

#[derive(Parser)]
#[command(name = "robot_monitor")]
#[command(version = "0.1.0")]
#[command(about = "Replay diagnostics snapshot logs through the status tree monitor")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML config file (environment variables override it)
    #[arg(long, short, global = true, env = "ROBOT_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Suppress per-cycle display events
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Legacy,
    Indexed,
}

impl From<ModeArg> for ReconcileMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Legacy => ReconcileMode::Legacy,
            ModeArg::Indexed => ReconcileMode::Indexed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Feed every snapshot in a log through the monitor
    Replay {
        /// Snapshot log (JSON Lines)
        #[arg(short, long)]
        file: PathBuf,

        /// Reconciliation walk (overrides config)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Node path whose detail view to print after the replay
        #[arg(long)]
        inspect: Option<String>,
    },

    /// Validate every snapshot in a log
    Check {
        /// Snapshot log (JSON Lines)
        #[arg(short, long)]
        file: PathBuf,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,robot_monitor=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Replay {
            file,
            mode,
            inspect,
        } => load_config(cli.config.as_deref()).and_then(|mut config| {
            if let Some(mode) = mode {
                config.reconcile_mode = (*mode).into();
            }
            replay(config, file, inspect.as_deref(), cli.quiet)
        }),
        Commands::Check { file } => check(file),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let base = match path {
        Some(path) => MonitorConfig::from_yaml_file(path)?,
        None => MonitorConfig::default(),
    };
    Ok(base.with_env_overrides(|key| std::env::var(key).ok())?)
}

fn read_lines(file: &Path) -> Result<Vec<(usize, String)>> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("opening {}", file.display()))?,
    );
    let mut lines = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", file.display()))?;
        if !line.trim().is_empty() {
            lines.push((index + 1, line));
        }
    }
    Ok(lines)
}

// =============================================================================
// REPLAY
// =============================================================================

/// Prints display events as they happen.
struct ConsoleDisplay {
    quiet: bool,
}

impl DisplaySink for ConsoleDisplay {
    fn roots_added(&mut self, roots: &[TreeNode]) {
        if !self.quiet {
            for root in roots {
                println!("+ root /{} ({} nodes)", root.nice_name(), root.node_count());
            }
        }
    }

    fn children_added(&mut self, parent: &TreeNode, children: &[TreeNode]) {
        if !self.quiet {
            for child in children {
                println!("+ {} -> /{}", parent.name(), child.nice_name());
            }
        }
    }

    fn errors_replaced(&mut self, errors: &[String]) {
        if !self.quiet && !errors.is_empty() {
            println!("  {} error(s)", errors.len());
        }
    }

    fn warnings_replaced(&mut self, warnings: &[String]) {
        if !self.quiet && !warnings.is_empty() {
            println!("  {} warning(s)", warnings.len());
        }
    }
}

fn replay(
    config: MonitorConfig,
    file: &Path,
    inspect: Option<&str>,
    quiet: bool,
) -> Result<ExitCode> {
    let lines = read_lines(file)?;
    let (publisher, subscription) = snapshot_channel(config.topic.clone(), config.channel_capacity);
    let mut monitor = RobotMonitor::new(config, ConsoleDisplay { quiet });
    monitor.subscribe(subscription);

    let mut inspector = None;
    let mut undecodable = 0usize;
    for (line_no, line) in &lines {
        let records: Vec<Record> = match serde_json::from_str(line) {
            Ok(records) => records,
            Err(e) => {
                undecodable += 1;
                eprintln!("line {line_no}: undecodable snapshot: {e}");
                continue;
            }
        };
        publisher.publish(records);
        monitor.poll();

        if inspector.is_none() {
            if let Some(path) = inspect {
                inspector = monitor.open_inspector(path);
            }
        }
    }
    monitor.close();

    println!();
    println!("All");
    for (depth, node) in monitor.forest().walk() {
        println!(
            "{:indent$}/{} [{}] {}",
            "",
            node.nice_name(),
            node.level(),
            node.message(),
            indent = depth * 2
        );
    }
    print_list("Errors", &monitor.severity().errors);
    print_list("Warnings", &monitor.severity().warnings);

    if let Some(path) = inspect {
        println!();
        match &inspector {
            Some(inspector) => print!("{}", inspector.detail()),
            None => println!("{path}: no such node"),
        }
    }

    let stats = monitor.stats();
    let rejected = stats.rejected as usize + undecodable;
    println!();
    println!(
        "{} snapshot(s): {} applied, {} rejected",
        lines.len(),
        stats.applied,
        rejected
    );
    Ok(if rejected == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_list(title: &str, lines: &[String]) {
    println!();
    println!("{title}");
    for line in lines {
        println!("  {line}");
    }
}

// =============================================================================
// CHECK
// =============================================================================

fn check(file: &Path) -> Result<ExitCode> {
    let lines = read_lines(file)?;
    let mut bad = 0usize;
    for (line_no, line) in &lines {
        match Snapshot::from_json(line) {
            Ok(snapshot) => {
                let flagged = snapshot
                    .records()
                    .iter()
                    .filter(|r| matches!(r.level, Level::Warn | Level::Error))
                    .count();
                println!(
                    "line {line_no}: ok ({} records, {flagged} flagged)",
                    snapshot.len()
                );
            }
            Err(e) => {
                bad += 1;
                println!("line {line_no}: {} {e}", e.code());
            }
        }
    }
    println!("{} snapshot(s), {bad} rejected", lines.len());
    Ok(if bad == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
