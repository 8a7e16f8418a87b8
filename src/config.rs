//! Watcher configuration.
//!
//! Settings are loaded from a TOML file and can be overridden from the command
//! line. Every key is optional; missing keys take the built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! watched_root = "/home/me/Downloads"
//! batch_size = 10
//! timeout_secs = 300
//! poll_interval_secs = 1
//! fallback_category = "Others"
//! temp_suffixes = [".crdownload", ".tmp", ".part"]
//! leave_temp_files = false
//!
//! [[categories]]
//! name = "Images"
//! extensions = [".jpg", ".png"]
//!
//! [[categories]]
//! name = "Documents"
//! extensions = [".pdf", ".txt"]
//!
//! [ignore]
//! filenames = ["desktop.ini"]
//! patterns = ["*.torrent"]
//! regex = ["^~\\$"]
//! ```
//!
//! Categories are an array of tables so their declaration order is kept:
//! when an extension appears twice, the first category wins.

use crate::file_category::{
    CategoryRule, DEFAULT_FALLBACK, DEFAULT_TEMP_SUFFIXES, FileMapper, TempFileFilter,
    default_rules,
};
use crate::scheduler::TriggerConfig;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".tidywatchrc.toml";

/// Errors that make the configuration unusable. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("could not read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("invalid category name '{0}': must be a plain folder name")]
    InvalidCategoryName(String),

    #[error("invalid extension '{extension}' in '{owner}': expected a leading dot, e.g. '.jpg'")]
    InvalidExtension { owner: String, extension: String },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("no watched directory given and no download directory could be determined")]
    NoWatchedRoot,

    #[error("watched path is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),
}

/// All recognized settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory to watch. Defaults to the user's download directory.
    pub watched_root: Option<PathBuf>,
    /// Number of distinct pending paths that triggers a pass.
    pub batch_size: usize,
    /// Seconds of silence after the last event that trigger a pass.
    pub timeout_secs: u64,
    /// Seconds between silence checks.
    pub poll_interval_secs: u64,
    /// Folder for files that match no category.
    pub fallback_category: String,
    /// Suffixes of in-progress files. Events for them are never buffered.
    pub temp_suffixes: Vec<String>,
    /// Keep temp-suffixed files out of passes too. By default a pass sends
    /// leftovers such as an aborted `.part` to the fallback folder.
    pub leave_temp_files: bool,
    /// Ordered category table.
    pub categories: Vec<CategoryRule>,
    /// Files left where they are.
    pub ignore: IgnoreRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            watched_root: None,
            batch_size: 10,
            timeout_secs: 300,
            poll_interval_secs: 1,
            fallback_category: DEFAULT_FALLBACK.to_string(),
            temp_suffixes: DEFAULT_TEMP_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            leave_temp_files: false,
            categories: default_rules(),
            ignore: IgnoreRules::default(),
        }
    }
}

/// Rules for files that are never moved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IgnoreRules {
    /// Exact file names (e.g. "desktop.ini").
    pub filenames: Vec<String>,
    /// Glob patterns matched against the file name (e.g. "*.torrent").
    pub patterns: Vec<String>,
    /// Regex patterns matched against the file name.
    pub regex: Vec<String>,
}

impl Settings {
    /// Load settings, falling back to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.tidywatchrc.toml` in the current directory
    /// 3. Look for `tidywatch/config.toml` in the user's config directory
    /// 4. Fall back to the default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found but cannot be read or parsed, or if
    /// an explicitly given file does not exist.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tidywatch").join("config.toml");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Check every value that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        validate_folder_name(&self.fallback_category)?;

        let mut seen = HashSet::new();
        for rule in &self.categories {
            validate_folder_name(&rule.name)?;
            if !seen.insert(rule.name.to_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    field: "categories",
                    reason: format!("category '{}' is declared twice", rule.name),
                });
            }
            for ext in &rule.extensions {
                validate_extension(&rule.name, ext)?;
            }
        }

        for suffix in &self.temp_suffixes {
            validate_extension("temp_suffixes", suffix)?;
        }

        Ok(())
    }

    /// Resolve the directory to watch and check it exists.
    pub fn resolve_root(&self) -> Result<PathBuf, ConfigError> {
        let root = match &self.watched_root {
            Some(root) => root.clone(),
            None => dirs::download_dir().ok_or(ConfigError::NoWatchedRoot)?,
        };

        if !root.is_dir() {
            return Err(ConfigError::RootNotADirectory(root));
        }
        Ok(root)
    }

    /// Build the extension classifier.
    pub fn mapper(&self) -> FileMapper {
        FileMapper::new(&self.categories, &self.fallback_category)
    }

    /// Build the temp-file filter.
    pub fn temp_filter(&self) -> TempFileFilter {
        TempFileFilter::new(&self.temp_suffixes)
    }

    /// Thresholds for the trigger scheduler.
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            batch_size: self.batch_size,
            timeout: Duration::from_secs(self.timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}

fn validate_folder_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || name.contains(['/', '\\'])
    {
        return Err(ConfigError::InvalidCategoryName(name.to_string()));
    }
    Ok(())
}

fn validate_extension(owner: &str, ext: &str) -> Result<(), ConfigError> {
    let valid = ext.len() > 1
        && ext.starts_with('.')
        && !ext[1..].contains(['.', '/', '\\'])
        && !ext.contains(char::is_whitespace);
    if !valid {
        return Err(ConfigError::InvalidExtension {
            owner: owner.to_string(),
            extension: ext.to_string(),
        });
    }
    Ok(())
}

impl IgnoreRules {
    /// Compile the rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile(&self) -> Result<IgnoreFilters, ConfigError> {
        let patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = self
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IgnoreFilters {
            filenames: self.filenames.iter().cloned().collect(),
            patterns,
            regexes,
        })
    }
}

/// Compiled ignore rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilters {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl IgnoreFilters {
    /// Check if a file must be left in place.
    ///
    /// Checks run in this order, stopping at the first match:
    /// 1. Exact filename
    /// 2. Glob pattern on the file name
    /// 3. Regex on the file name
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };

        self.filenames.contains(file_name.as_ref())
            || self.patterns.iter().any(|p| p.matches(&file_name))
            || self.regexes.iter().any(|r| r.is_match(&file_name))
    }
}
