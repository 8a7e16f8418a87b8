//! Organization pass and move executor.
//!
//! This module sweeps the watched root, classifies every entry by extension
//! and moves files into category subdirectories. A failed move never aborts
//! the pass: it is recorded in the [`PassReport`] and the sweep continues.

use crate::config::IgnoreFilters;
use crate::file_category::{Category, FileMapper, TempFileFilter};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while moving a single file.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The file is gone: already moved, or removed by someone else.
    #[error("{} no longer exists", .path.display())]
    SourceMissing { path: PathBuf },

    /// The category directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file with the same name is already in the category directory.
    #[error("{} already exists", .destination.display())]
    DestinationExists { destination: PathBuf },

    /// The source path has no final component.
    #[error("{} has no file name", .path.display())]
    MissingFileName { path: PathBuf },

    /// The rename itself failed.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Moves a file into `<base_path>/<category_dir_name>/` under its own name.
///
/// The category directory is created on demand; creating one that already
/// exists is not an error. An existing file at the destination is never
/// overwritten.
///
/// # Returns
///
/// The destination path on success.
///
/// # Examples
///
/// ```no_run
/// use tidywatch::file_organizer::move_to_category;
/// use std::path::Path;
///
/// match move_to_category(
///     Path::new("/home/me/Downloads"),
///     Path::new("/home/me/Downloads/photo.png"),
///     "Images",
/// ) {
///     Ok(dest) => println!("Moved to {}", dest.display()),
///     Err(e) => eprintln!("Move failed: {}", e),
/// }
/// ```
pub fn move_to_category(
    base_path: &Path,
    file_path: &Path,
    category_dir_name: &str,
) -> Result<PathBuf, MoveError> {
    let file_name = file_path
        .file_name()
        .ok_or_else(|| MoveError::MissingFileName {
            path: file_path.to_path_buf(),
        })?;

    // symlink_metadata so a dangling link still counts as present
    if fs::symlink_metadata(file_path).is_err() {
        return Err(MoveError::SourceMissing {
            path: file_path.to_path_buf(),
        });
    }

    let category_path = base_path.join(category_dir_name);
    fs::create_dir_all(&category_path).map_err(|source| MoveError::DirectoryCreation {
        path: category_path.clone(),
        source,
    })?;

    let destination_path = category_path.join(file_name);
    if fs::symlink_metadata(&destination_path).is_ok() {
        return Err(MoveError::DestinationExists {
            destination: destination_path,
        });
    }

    fs::rename(file_path, &destination_path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound && fs::symlink_metadata(file_path).is_err() {
            MoveError::SourceMissing {
                path: file_path.to_path_buf(),
            }
        } else {
            MoveError::Io {
                from: file_path.to_path_buf(),
                to: destination_path.clone(),
                source,
            }
        }
    })?;

    Ok(destination_path)
}

/// Why an entry is left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Directory,
    /// The running executable.
    OwnExecutable,
    /// Still being downloaded or written.
    Temporary,
    /// Matched a configured ignore rule.
    Ignored,
}

/// What a pass intends to do with one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move {
        category: String,
        /// True when no category matched.
        fallback: bool,
    },
    Skip(SkipReason),
}

/// One entry of the watched root and its planned action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub path: PathBuf,
    pub action: Action,
}

/// Result of a pass for one entry.
#[derive(Debug)]
pub enum Outcome {
    Moved {
        category: String,
        destination: PathBuf,
    },
    MovedToFallback {
        category: String,
        destination: PathBuf,
    },
    SkippedDirectory,
    SkippedSelf,
    SkippedTemporary,
    SkippedIgnored,
    Failed(MoveError),
}

impl From<SkipReason> for Outcome {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::Directory => Outcome::SkippedDirectory,
            SkipReason::OwnExecutable => Outcome::SkippedSelf,
            SkipReason::Temporary => Outcome::SkippedTemporary,
            SkipReason::Ignored => Outcome::SkippedIgnored,
        }
    }
}

/// Everything one pass did, entry by entry.
#[derive(Debug, Default)]
pub struct PassReport {
    pub entries: Vec<(PathBuf, Outcome)>,
}

impl PassReport {
    /// Number of files moved, fallback included.
    pub fn moved(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Moved { .. } | Outcome::MovedToFallback { .. }))
            .count()
    }

    /// Number of files whose move failed.
    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Failed(_)))
            .count()
    }

    /// Number of files that disappeared before they could be moved.
    pub fn vanished(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Failed(MoveError::SourceMissing { .. })))
            .count()
    }

    /// Failed moves that need attention. Vanished sources are left out: a file
    /// renamed or deleted mid-pass is expected in a download folder.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &MoveError)> {
        self.entries.iter().filter_map(|(path, outcome)| match outcome {
            Outcome::Failed(MoveError::SourceMissing { .. }) => None,
            Outcome::Failed(e) => Some((path.as_path(), e)),
            _ => None,
        })
    }

    /// Number of entries left in place on purpose.
    pub fn skipped(&self) -> usize {
        self.entries.len() - self.moved() - self.failed()
    }

    /// Files moved per category folder.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (_, outcome) in &self.entries {
            if let Outcome::Moved { category, .. } | Outcome::MovedToFallback { category, .. } =
                outcome
            {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// The outcome recorded for `path`, if the pass saw it.
    pub fn outcome_for(&self, path: &Path) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_path() == path)
            .map(|(_, outcome)| outcome)
    }
}

/// Something that can run a full organization pass.
pub trait Organize {
    /// Runs one pass to completion. Never fails as a whole.
    fn organize(&self) -> PassReport;
}

/// Organizes the immediate entries of one directory into category folders.
#[derive(Debug, Clone)]
pub struct Organizer {
    root: PathBuf,
    mapper: FileMapper,
    temp_filter: Option<TempFileFilter>,
    ignore: IgnoreFilters,
    self_path: Option<PathBuf>,
}

impl Organizer {
    /// Creates an organizer for `root`. The running executable is excluded
    /// from every pass.
    pub fn new(root: PathBuf, mapper: FileMapper, ignore: IgnoreFilters) -> Self {
        let self_path = std::env::current_exe().ok();
        Self {
            root,
            mapper,
            temp_filter: None,
            ignore,
            self_path: None,
        }
        .with_self_path(self_path)
    }

    /// Leaves files matching `filter` in the root instead of sending them to
    /// the fallback folder. Off unless configured, so an aborted download
    /// still gets cleaned up.
    pub fn leave_temp_files(mut self, filter: TempFileFilter) -> Self {
        self.temp_filter = Some(filter);
        self
    }

    /// Overrides which file counts as the organizer's own executable.
    pub fn with_self_path(mut self, path: Option<PathBuf>) -> Self {
        self.self_path = path.map(|p| fs::canonicalize(&p).unwrap_or(p));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mapper(&self) -> &FileMapper {
        &self.mapper
    }

    fn is_self(&self, path: &Path) -> bool {
        let Some(self_path) = &self.self_path else {
            return false;
        };
        if path.file_name() != self_path.file_name() {
            return false;
        }
        path == self_path.as_path()
            || fs::canonicalize(path).is_ok_and(|canonical| canonical == *self_path)
    }

    /// Decides the action for a single path without touching it.
    pub fn plan_entry(&self, path: &Path) -> Action {
        if path.is_dir() {
            return Action::Skip(SkipReason::Directory);
        }
        if self.is_self(path) {
            return Action::Skip(SkipReason::OwnExecutable);
        }
        if self
            .temp_filter
            .as_ref()
            .is_some_and(|filter| filter.is_temp_file(path))
        {
            return Action::Skip(SkipReason::Temporary);
        }
        if self.ignore.is_ignored(path) {
            return Action::Skip(SkipReason::Ignored);
        }

        let category = self.mapper.classify(path);
        Action::Move {
            category: self.mapper.dir_name(category).to_string(),
            fallback: category == Category::Fallback,
        }
    }

    /// Lists the root and plans every entry, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be listed.
    pub fn plan(&self) -> io::Result<Vec<PlannedAction>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let action = self.plan_entry(&path);
                PlannedAction { path, action }
            })
            .collect())
    }

    fn execute(&self, planned: PlannedAction) -> (PathBuf, Outcome) {
        let PlannedAction { path, action } = planned;
        let outcome = match action {
            Action::Skip(reason) => {
                debug!(path = %path.display(), ?reason, "skipping entry");
                reason.into()
            }
            Action::Move { category, fallback } => {
                match move_to_category(&self.root, &path, &category) {
                    Ok(destination) => {
                        info!("Moved: {} ----> {}", path.display(), destination.display());
                        if fallback {
                            Outcome::MovedToFallback {
                                category,
                                destination,
                            }
                        } else {
                            Outcome::Moved {
                                category,
                                destination,
                            }
                        }
                    }
                    Err(e @ MoveError::SourceMissing { .. }) => {
                        debug!("Skipping vanished file: {}", e);
                        Outcome::Failed(e)
                    }
                    Err(e) => {
                        warn!("Error moving {}: {}", path.display(), e);
                        Outcome::Failed(e)
                    }
                }
            }
        };
        (path, outcome)
    }
}

impl Organize for Organizer {
    fn organize(&self) -> PassReport {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Could not list {}: {}", self.root.display(), e);
                return PassReport::default();
            }
        };

        let entries = plan.into_iter().map(|p| self.execute(p)).collect();
        let report = PassReport { entries };
        info!(
            moved = report.moved(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Done organizing {}",
            self.root.display()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn organizer(base_path: &Path) -> Organizer {
        Organizer::new(
            base_path.to_path_buf(),
            FileMapper::default(),
            IgnoreFilters::default(),
        )
    }

    #[test]
    fn test_move_to_category_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let destination =
            move_to_category(base_path, &file_path, "Documents").expect("Failed to move file");

        let category_dir = base_path.join("Documents");
        assert!(category_dir.is_dir());
        assert!(!file_path.exists());
        assert_eq!(destination, category_dir.join("test.txt"));
        assert!(destination.exists());
    }

    #[test]
    fn test_move_to_category_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let category_dir = base_path.join("Images");
        fs::create_dir(&category_dir).expect("Failed to create category directory");

        let file_path = base_path.join("test.png");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        move_to_category(base_path, &file_path, "Images").expect("Failed to move file");

        assert!(!file_path.exists());
        assert!(category_dir.join("test.png").exists());
    }

    #[test]
    fn test_move_missing_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let result = move_to_category(base_path, &base_path.join("gone.pdf"), "Documents");
        assert!(matches!(result, Err(MoveError::SourceMissing { .. })));
    }

    #[test]
    fn test_move_refuses_to_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        fs::create_dir(base_path.join("Documents")).unwrap();
        fs::write(base_path.join("Documents").join("cv.pdf"), "old").unwrap();
        fs::write(base_path.join("cv.pdf"), "new").unwrap();

        let result = move_to_category(base_path, &base_path.join("cv.pdf"), "Documents");
        assert!(matches!(result, Err(MoveError::DestinationExists { .. })));

        assert_eq!(fs::read_to_string(base_path.join("cv.pdf")).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(base_path.join("Documents").join("cv.pdf")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_move_when_category_path_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        // A plain file squatting on the category name.
        fs::write(base_path.join("Images"), "not a dir").unwrap();
        fs::write(base_path.join("a.png"), "png").unwrap();

        let result = move_to_category(base_path, &base_path.join("a.png"), "Images");
        assert!(matches!(result, Err(MoveError::DirectoryCreation { .. })));
        assert!(base_path.join("a.png").exists());
    }

    #[test]
    fn test_plan_entry_actions() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Images")).unwrap();

        let organizer = organizer(base_path);
        assert_eq!(
            organizer.plan_entry(&base_path.join("Images")),
            Action::Skip(SkipReason::Directory)
        );
        assert_eq!(
            organizer.plan_entry(&base_path.join("x.crdownload")),
            Action::Move {
                category: "Others".to_string(),
                fallback: true
            }
        );
        assert_eq!(
            organizer.plan_entry(&base_path.join("a.jpg")),
            Action::Move {
                category: "Images".to_string(),
                fallback: false
            }
        );
        assert_eq!(
            organizer.plan_entry(&base_path.join("notes")),
            Action::Move {
                category: "Others".to_string(),
                fallback: true
            }
        );
    }

    #[test]
    fn test_temp_files_kept_only_when_configured() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let organizer = organizer(base_path).leave_temp_files(TempFileFilter::default());
        assert_eq!(
            organizer.plan_entry(&base_path.join("x.crdownload")),
            Action::Skip(SkipReason::Temporary)
        );
        assert_eq!(
            organizer.plan_entry(&base_path.join("x.zip")),
            Action::Move {
                category: "Archives".to_string(),
                fallback: false
            }
        );
    }

    #[test]
    fn test_organize_skips_own_executable() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let own = base_path.join("organizer.py");
        fs::write(&own, "print('hi')").unwrap();
        fs::write(base_path.join("script.py"), "print('other')").unwrap();

        let organizer = organizer(base_path).with_self_path(Some(own.clone()));
        let report = organizer.organize();

        assert!(own.exists());
        assert!(matches!(report.outcome_for(&own), Some(Outcome::SkippedSelf)));
        assert!(base_path.join("Code").join("script.py").exists());
    }

    #[test]
    fn test_failed_move_does_not_abort_pass() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        fs::create_dir(base_path.join("Images")).unwrap();
        fs::write(base_path.join("Images").join("dup.jpg"), "old").unwrap();
        fs::write(base_path.join("dup.jpg"), "new").unwrap();
        fs::write(base_path.join("other.pdf"), "pdf").unwrap();

        let report = organizer(base_path).organize();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.moved(), 1);
        assert!(base_path.join("dup.jpg").exists());
        assert!(base_path.join("Documents").join("other.pdf").exists());
    }

    #[test]
    fn test_vanished_source_is_not_a_reported_failure() {
        let report = PassReport {
            entries: vec![
                (
                    PathBuf::from("/dl/gone.zip"),
                    Outcome::Failed(MoveError::SourceMissing {
                        path: PathBuf::from("/dl/gone.zip"),
                    }),
                ),
                (
                    PathBuf::from("/dl/dup.jpg"),
                    Outcome::Failed(MoveError::DestinationExists {
                        destination: PathBuf::from("/dl/Images/dup.jpg"),
                    }),
                ),
                (
                    PathBuf::from("/dl/a.pdf"),
                    Outcome::Moved {
                        category: "Documents".to_string(),
                        destination: PathBuf::from("/dl/Documents/a.pdf"),
                    },
                ),
            ],
        };

        assert_eq!(report.failed(), 2);
        assert_eq!(report.vanished(), 1);
        let failures: Vec<_> = report.failures().map(|(path, _)| path).collect();
        assert_eq!(failures, vec![Path::new("/dl/dup.jpg")]);
    }

    #[test]
    fn test_organize_unreadable_root_returns_empty_report() {
        let report = organizer(Path::new("/non/existent/path")).organize();
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_category_counts() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        for name in ["a.jpg", "b.png", "c.pdf", "d"] {
            fs::write(base_path.join(name), name).unwrap();
        }

        let counts = organizer(base_path).organize().category_counts();

        assert_eq!(counts.get("Images"), Some(&2));
        assert_eq!(counts.get("Documents"), Some(&1));
        assert_eq!(counts.get("Others"), Some(&1));
    }
}
