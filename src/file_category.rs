//! Extension-based file categorization.
//!
//! This module maps file extensions to named categories (e.g. "Images",
//! "Documents") and recognizes in-progress download files that must never be
//! organized mid-write.
//!
//! # Examples
//!
//! ```
//! use tidywatch::file_category::{Category, FileMapper};
//!
//! let mapper = FileMapper::default();
//! assert_eq!(mapper.classify("holiday.JPG"), Category::Named("Images"));
//! assert_eq!(mapper.classify("report.pdf"), Category::Named("Documents"));
//! assert_eq!(mapper.classify("readme"), Category::Fallback);
//! ```
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Name of the catch-all category for unmatched files.
pub const DEFAULT_FALLBACK: &str = "Others";

/// Suffixes of files that are still being written.
pub const DEFAULT_TEMP_SUFFIXES: &[&str] = &[".crdownload", ".tmp", ".part"];

/// A named destination folder and the extensions routed into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Folder name, created directly under the watched root.
    pub name: String,
    /// Extensions with their leading dot, e.g. `.jpg`. Matched case-insensitively.
    pub extensions: Vec<String>,
}

impl CategoryRule {
    /// Creates a rule from a name and a list of extensions.
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// The built-in category table, in tie-break order.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Images", &[".jpg", ".jpeg", ".png", ".gif", ".webp"]),
        CategoryRule::new(
            "Documents",
            &[".pdf", ".docx", ".txt", ".xlsx", ".pptx", ".doc"],
        ),
        CategoryRule::new("Installer", &[".exe", ".msi"]),
        CategoryRule::new("Archives", &[".zip", ".rar", ".7z"]),
        CategoryRule::new(
            "Code",
            &[".py", ".c", ".cpp", ".js", ".html", ".java", ".md", ".h"],
        ),
        CategoryRule::new("Video", &[".mp4", ".mp3"]),
    ]
}

/// Returns the lower-cased extension of `path` with its leading dot.
///
/// Follows [`Path::extension`]: `archive.tar.gz` yields `.gz`, while
/// `.bashrc` and `readme` have no extension.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Result of classifying a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category<'a> {
    /// A configured category matched.
    Named(&'a str),
    /// Nothing matched; the file goes to the fallback folder.
    Fallback,
}

/// Maps file extensions to categories.
///
/// Categories are consulted in declaration order, so when an extension is
/// listed under two categories the earlier one always wins.
#[derive(Debug, Clone)]
pub struct FileMapper {
    categories: Vec<String>,
    extension_map: HashMap<String, usize>,
    fallback: String,
}

impl FileMapper {
    /// Creates a mapper from ordered rules and a fallback folder name.
    pub fn new(rules: &[CategoryRule], fallback: &str) -> Self {
        let mut mapper = Self {
            categories: Vec::with_capacity(rules.len()),
            extension_map: HashMap::new(),
            fallback: fallback.to_string(),
        };
        for rule in rules {
            mapper.add_rule(rule);
        }
        mapper
    }

    fn add_rule(&mut self, rule: &CategoryRule) {
        let index = self.categories.len();
        self.categories.push(rule.name.clone());
        for ext in &rule.extensions {
            // First registration wins.
            self.extension_map
                .entry(ext.to_lowercase())
                .or_insert(index);
        }
    }

    /// Maps a dotted extension (`.png`, `.PNG`) to its category name.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidywatch::file_category::FileMapper;
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category(".PDF"), Some("Documents"));
    /// assert_eq!(mapper.extension_to_category(".xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<&str> {
        self.extension_map
            .get(&ext.to_lowercase())
            .map(|&index| self.categories[index].as_str())
    }

    /// Classifies a file name or path by its extension.
    pub fn classify(&self, file_name: impl AsRef<Path>) -> Category<'_> {
        dotted_extension(file_name.as_ref())
            .and_then(|ext| self.extension_to_category(&ext))
            .map_or(Category::Fallback, Category::Named)
    }

    /// Resolves a classification to the folder name it lands in.
    pub fn dir_name<'a>(&'a self, category: Category<'a>) -> &'a str {
        match category {
            Category::Named(name) => name,
            Category::Fallback => &self.fallback,
        }
    }

    /// The fallback folder name.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Category names in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new(&default_rules(), DEFAULT_FALLBACK)
    }
}

/// Recognizes files that are still being downloaded or written.
#[derive(Debug, Clone)]
pub struct TempFileFilter {
    suffixes: HashSet<String>,
}

impl TempFileFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true when the extension of `path` is a temp suffix.
    pub fn is_temp_file(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.suffixes.contains(&ext))
    }
}

impl Default for TempFileFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_SUFFIXES)
    }
}
