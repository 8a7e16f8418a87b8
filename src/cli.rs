//! Command-line interface module for tidywatch.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and configuration overrides
//! - One-shot organization and dry runs
//! - Starting the watcher and wiring Ctrl-C to a graceful shutdown

use crate::config::{ConfigError, Settings};
use crate::file_organizer::{Organize, Organizer};
use crate::output::OutputFormatter;
use crate::scheduler::Scheduler;
use crate::watcher::{self, DirectoryWatcher, RunStats, WatchError};
use anyhow::Context;
use clap::{ArgAction, Parser};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

/// Watch a directory and sort new files into category folders.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "tidywatch", version, about)]
pub struct Cli {
    /// Directory to watch. Defaults to your download directory.
    pub root: Option<PathBuf>,

    /// Configuration file (TOML).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of distinct changed files that triggers a pass.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Seconds of inactivity after which pending files are organized.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between inactivity checks.
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Organize once and exit instead of watching.
    #[arg(long)]
    pub once: bool,

    /// With --once, only show what would be moved.
    #[arg(long, requires = "once")]
    pub dry_run: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What the process should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Watch the directory until interrupted.
    Watch,
    /// Run a single pass.
    Once {
        /// If true, simulate the pass without moving files.
        dry_run: bool,
    },
}

impl Cli {
    pub fn mode(&self) -> OrganizeCommand {
        if self.once {
            OrganizeCommand::Once {
                dry_run: self.dry_run,
            }
        } else {
            OrganizeCommand::Watch
        }
    }

    /// Applies command-line values on top of file settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(root) = &self.root {
            settings.watched_root = Some(root.clone());
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if let Some(poll_interval) = self.poll_interval {
            settings.poll_interval_secs = poll_interval;
        }
    }
}

/// Loads the configuration, applies CLI overrides and validates the result.
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Builds the organizer for `root` from validated settings.
pub fn build_organizer(settings: &Settings, root: PathBuf) -> Result<Organizer, ConfigError> {
    let organizer = Organizer::new(root, settings.mapper(), settings.ignore.compile()?);
    if settings.leave_temp_files {
        return Ok(organizer.leave_temp_files(settings.temp_filter()));
    }
    Ok(organizer)
}

/// Runs the application for parsed arguments.
///
/// # Errors
///
/// Configuration and watch-registration problems are returned as errors;
/// per-file failures are only reported.
pub async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli).context("Error loading configuration")?;
    let root = settings.resolve_root()?;
    let organizer = build_organizer(&settings, root.clone())?;

    match cli.mode() {
        OrganizeCommand::Once { dry_run: true } => {
            OutputFormatter::info(&format!("DRY RUN: Analyzing contents of: {}", root.display()));
            let plan = organizer
                .plan()
                .with_context(|| format!("Error reading directory {}", root.display()))?;
            OutputFormatter::dry_run_plan(&plan);
        }
        OrganizeCommand::Once { dry_run: false } => {
            OutputFormatter::info(&format!("Organizing contents of: {}", root.display()));
            let report = tokio::task::spawn_blocking(move || organizer.organize()).await?;
            OutputFormatter::pass_report(None, &report);
        }
        OrganizeCommand::Watch => {
            let shutdown = interrupt_signal().context("Unable to listen for Ctrl-C")?;
            let stats = watch_directory(&settings, &root, organizer, shutdown).await?;
            info!(passes = stats.passes, events = stats.events, "Watcher stopped");
        }
    }

    Ok(())
}

/// Watches `root` and organizes it until `shutdown` resolves.
///
/// # Errors
///
/// Returns `WatchError` if the directory cannot be watched.
pub async fn watch_directory<S>(
    settings: &Settings,
    root: &Path,
    organizer: Organizer,
    shutdown: S,
) -> Result<RunStats, WatchError>
where
    S: Future<Output = ()>,
{
    let (sender, receiver) = unbounded_channel();
    let directory_watcher = DirectoryWatcher::start(root, sender)?;

    OutputFormatter::banner(root, settings.batch_size, settings.timeout_secs);

    let scheduler = Scheduler::new(settings.trigger_config(), settings.temp_filter());
    let stats = watcher::run(
        scheduler,
        Arc::new(organizer),
        receiver,
        shutdown,
        |trigger, report| OutputFormatter::pass_report(Some(trigger), report),
    )
    .await;

    drop(directory_watcher);
    Ok(stats)
}

/// Registers for Ctrl-C and returns a future that resolves on the first one.
///
/// Registration happens here, not on first poll, so an interrupt during the
/// startup pass is not lost.
#[cfg(unix)]
pub fn interrupt_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        interrupt.recv().await;
    })
}

/// Registers for Ctrl-C and returns a future that resolves on the first one.
#[cfg(windows)]
pub fn interrupt_signal() -> io::Result<impl Future<Output = ()>> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c()?;
    Ok(async move {
        ctrl_c.recv().await;
    })
}
