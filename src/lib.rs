//! tidywatch - A directory watcher that keeps a download folder organized
//!
//! This library provides utilities for classifying files by extension,
//! moving them into category folders, buffering filesystem notifications,
//! and deciding when an organization pass should run: on startup, once
//! enough files have changed, or after a quiet period.

pub mod buffer;
pub mod cli;
pub mod config;
pub mod events;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod scheduler;
pub mod watcher;

pub use buffer::EventBuffer;
pub use config::{ConfigError, IgnoreFilters, IgnoreRules, Settings};
pub use events::WatchEvent;
pub use file_category::{Category, CategoryRule, FileMapper, TempFileFilter};
pub use file_organizer::{MoveError, Organize, Organizer, Outcome, PassReport, move_to_category};
pub use scheduler::{Scheduler, Trigger, TriggerConfig};
pub use watcher::{DirectoryWatcher, RunStats, WatchError};

pub use cli::{Cli, OrganizeCommand, run_cli};
