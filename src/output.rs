//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored
//! output, progress tracking, and the end-of-run summary. This module
//! abstracts away output details, making it easy to change formatting
//! globally.

use crate::engine::RunReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar sized for `total` items.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the end-of-run summary: counters first, then any per-file
    /// failures that were skipped over.
    pub fn run_summary(report: &RunReport) {
        Self::header("SUMMARY");
        println!("  Files moved:        {}", report.stats.moved.to_string().green());
        println!(
            "  Duplicates deleted: {}",
            report.stats.deleted.to_string().green()
        );
        println!(
            "  Space saved:        {} KB",
            format!("{:.2}", report.stats.saved_kb).green()
        );
        println!("  Excluded folders:   {}", report.stats.skipped_folders);

        if !report.failures.is_empty() {
            Self::header("SKIPPED FILES");
            for (path, reason) in &report.failures {
                Self::error(&format!("{}: {}", path.display(), reason));
            }
        }
    }

    /// Prints one relocation record line for the history listing.
    pub fn history_line(timestamp: &str, original: &Path, new: &Path, label: &str) {
        println!(
            "{}  {} {} {}  [{}]",
            timestamp.cyan(),
            original.display(),
            "→".bold(),
            new.display(),
            label.yellow()
        );
    }
}
