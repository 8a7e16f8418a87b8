//! Output formatting and styling module.
//!
//! Human-readable summaries for the terminal: the watch banner, one block per
//! organization pass and the dry-run listing. Diagnostics go through `tracing`
//! instead; this module only prints what a user watching the terminal reads.

use crate::file_organizer::{Action, PassReport, PlannedAction, SkipReason};
use crate::scheduler::Trigger;
use colored::*;
use std::collections::HashMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Per-pass and dry-run summary tables
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidywatch::output::OutputFormatter;
    /// OutputFormatter::success("Organizer ready");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidywatch::output::OutputFormatter;
    /// OutputFormatter::error("Failed to watch directory");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidywatch::output::OutputFormatter;
    /// OutputFormatter::warning("Some files could not be organized");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidywatch::output::OutputFormatter;
    /// OutputFormatter::info("Watching folder: /home/user/Downloads");
    /// ```
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints the banner shown when watching starts.
    ///
    /// # Arguments
    ///
    /// * `root` - The watched directory
    /// * `batch_size` - Pending files that trigger a pass
    /// * `timeout_secs` - Seconds of silence that trigger a pass
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use tidywatch::output::OutputFormatter;
    /// OutputFormatter::banner(Path::new("/home/user/Downloads"), 10, 300);
    /// ```
    pub fn banner(root: &Path, batch_size: usize, timeout_secs: u64) {
        Self::info(&format!("Watching folder: {}", root.display()));
        Self::plain(&format!(
            "Organizing every {} files OR after {}s of silence. Press Ctrl-C to stop.",
            batch_size, timeout_secs
        ));
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints the result of one pass.
    ///
    /// Failed moves are listed as errors first. Files that vanished before
    /// their move are only counted, dimmed. A per-category table follows.
    ///
    /// # Arguments
    ///
    /// * `trigger` - Why the pass ran, or `None` for a `--once` run
    /// * `report` - The outcomes recorded by the pass
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidywatch::output::OutputFormatter;
    /// use tidywatch::{PassReport, Trigger};
    /// OutputFormatter::pass_report(Some(Trigger::Startup), &PassReport::default());
    /// ```
    pub fn pass_report(trigger: Option<Trigger>, report: &PassReport) {
        match trigger {
            Some(trigger) => Self::header(&format!("=== Pass: {} ===", trigger)),
            None => Self::header("=== Pass ==="),
        }

        let failures: Vec<_> = report.failures().collect();
        for (path, e) in &failures {
            Self::error(&format!("{}: {}", display_name(path), e));
        }
        if report.vanished() > 0 {
            println!(
                "{}",
                format!(
                    "{} {} vanished before being moved.",
                    report.vanished(),
                    plural(report.vanished())
                )
                .dimmed()
            );
        }

        if report.moved() == 0 {
            Self::plain("Nothing to organize.");
        } else {
            Self::summary_table(&report.category_counts(), report.moved());
        }

        if !failures.is_empty() {
            Self::warning(&format!(
                "{} {} could not be organized.",
                failures.len(),
                plural(failures.len())
            ));
        }
    }

    /// Prints what a pass would do without moving anything.
    ///
    /// Directories are not listed. Other skipped entries are shown dimmed
    /// with the reason they stay in place.
    ///
    /// # Arguments
    ///
    /// * `plan` - The planned action for every entry of the root
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidywatch::output::OutputFormatter;
    /// OutputFormatter::dry_run_plan(&[]);
    /// ```
    pub fn dry_run_plan(plan: &[PlannedAction]) {
        Self::dry_run_notice("Files would be organized as follows:");

        let mut counts: HashMap<String, usize> = HashMap::new();
        for planned in plan {
            let name = display_name(&planned.path);
            match &planned.action {
                Action::Move { category, .. } => {
                    println!(" - {}", name);
                    println!("   → Would move to {}/", category);
                    *counts.entry(category.clone()).or_insert(0) += 1;
                }
                Action::Skip(SkipReason::Directory) => {}
                Action::Skip(reason) => {
                    println!(" - {} {}", name, format!("(left in place: {:?})", reason).dimmed());
                }
            }
        }

        let total = counts.values().sum();
        if total == 0 {
            Self::plain("No files found to organize.");
        } else {
            Self::summary_table(&counts, total);
        }
        Self::success("Dry run complete. No files were modified.");
    }

    /// Prints a summary table with file counts by category.
    ///
    /// # Arguments
    ///
    /// * `category_counts` - HashMap of category names to file counts
    /// * `total_files` - Total number of files processed
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_files: usize) {
        let mut categories: Vec<_> = category_counts.iter().collect();
        categories.sort_by_key(|&(name, _)| name);

        let max_category_len = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(**count),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = max_category_len
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
