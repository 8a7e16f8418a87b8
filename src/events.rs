//! Filesystem notifications as seen by the scheduler.

use std::path::{Path, PathBuf};

/// A create, modify or move notification for one entry of the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An entry appeared.
    Created {
        path: PathBuf,
        /// Whether the entry was a directory when the event was observed.
        is_dir: bool,
    },
    /// An entry's content or metadata changed.
    Modified { path: PathBuf, is_dir: bool },
    /// An entry was renamed; only the destination matters.
    Moved {
        /// Unknown when the platform reports only the new name.
        from: Option<PathBuf>,
        to: PathBuf,
        is_dir: bool,
    },
}

impl WatchEvent {
    /// A file creation.
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::Created {
            path: path.into(),
            is_dir: false,
        }
    }

    /// A file modification.
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::Modified {
            path: path.into(),
            is_dir: false,
        }
    }

    /// A file rename.
    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Moved {
            from: Some(from.into()),
            to: to.into(),
            is_dir: false,
        }
    }

    /// The path that gets buffered: the destination for moves.
    pub fn path(&self) -> &Path {
        match self {
            Self::Created { path, .. } | Self::Modified { path, .. } => path,
            Self::Moved { to, .. } => to,
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            Self::Created { is_dir, .. }
            | Self::Modified { is_dir, .. }
            | Self::Moved { is_dir, .. } => *is_dir,
        }
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Modified { .. } => "modified",
            Self::Moved { .. } => "moved",
        }
    }
}
