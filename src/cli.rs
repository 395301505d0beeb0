//! Command-line interface module for dirsift.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing and validation
//! - Wiring configuration, audit log, and engine together
//! - The already-processed folder gate
//! - Progress rendering and the final report

use crate::audit::{AuditLog, DEFAULT_FILENAME};
use crate::backup;
use crate::config::SiftConfig;
use crate::engine::{OrganizeOptions, RelocationEngine};
use crate::output::OutputFormatter;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Organize directory trees into category/date hierarchies with duplicate
/// removal and a durable audit log.
#[derive(Debug, Parser)]
#[command(name = "dirsift", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Organize the files under a directory.
    Organize {
        /// The directory to organize.
        dir: PathBuf,

        /// Descend into subdirectories when discovering files.
        #[arg(long)]
        deep: bool,

        /// Sub-divide destinations by inferred year/month.
        #[arg(long = "by-date")]
        by_date: bool,

        /// Directory to leave untouched (repeatable).
        #[arg(long = "exclude", value_name = "DIR")]
        exclude: Vec<PathBuf>,

        /// Copy the tree to a timestamped sibling before organizing.
        #[arg(long)]
        backup: bool,

        /// Organize even if this folder was already processed.
        #[arg(long)]
        force: bool,

        /// Path to a configuration file.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Show recent relocation records from the audit log.
    History {
        /// Maximum number of records to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Emit the records as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Runs the parsed command. Errors are returned as display-ready strings for
/// the binary to print.
pub fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Organize {
            dir,
            deep,
            by_date,
            exclude,
            backup,
            force,
            config,
        } => run_organize(&dir, deep, by_date, exclude, backup, force, config.as_deref()),
        Command::History { limit, json } => run_history(limit, json),
    }
}

fn run_organize(
    dir: &Path,
    deep: bool,
    by_date: bool,
    mut exclude: Vec<PathBuf>,
    make_backup: bool,
    force: bool,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let config = SiftConfig::load(config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let categories = config.category_map();
    exclude.extend(config.exclude.folders.iter().cloned());

    let audit = AuditLog::open(Path::new(DEFAULT_FILENAME))
        .map_err(|e| format!("Error opening audit log: {}", e))?;

    // Gate: warn when this folder already completed a run.
    if audit
        .is_processed(dir)
        .map_err(|e| format!("Error reading audit log: {}", e))?
        && !force
    {
        let last = audit
            .last_run(dir)
            .map_err(|e| format!("Error reading audit log: {}", e))?
            .unwrap_or_else(|| "unknown".to_string());
        OutputFormatter::warning(&format!(
            "{} was already processed (last run: {}). Pass --force to organize it again.",
            dir.display(),
            last
        ));
        return Ok(());
    }

    if make_backup {
        OutputFormatter::info(&format!("Backing up {} ...", dir.display()));
        let pb = OutputFormatter::create_progress_bar(0);
        let backup_path = backup::backup(dir, &exclude, &mut |current, total, message| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
            pb.set_message(message.to_string());
        })
        .map_err(|e| format!("Backup failed: {}", e))?;
        pb.finish_and_clear();
        OutputFormatter::success(&format!("Backup created at {}", backup_path.display()));
    }

    OutputFormatter::info(&format!("Organizing contents of: {}", dir.display()));

    let options = OrganizeOptions {
        deep_search: deep || config.options.deep_search,
        use_date: by_date || config.options.use_date,
        exclusions: exclude,
        filters,
    };

    let engine = RelocationEngine::new(&audit, &categories);
    let pb = OutputFormatter::create_progress_bar(0);
    let report = engine
        .organize(dir, &options, &mut |current, total, message| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
            pb.set_message(message.to_string());
        })
        .map_err(|e| format!("Error: {}", e))?;
    pb.finish_and_clear();

    OutputFormatter::run_summary(&report);
    OutputFormatter::success("Organization complete!");
    Ok(())
}

fn run_history(limit: usize, as_json: bool) -> Result<(), String> {
    let audit = AuditLog::open(Path::new(DEFAULT_FILENAME))
        .map_err(|e| format!("Error opening audit log: {}", e))?;
    let records = audit
        .recent_records(limit)
        .map_err(|e| format!("Error reading audit log: {}", e))?;

    if as_json {
        let doc = json!(records
            .iter()
            .map(|r| {
                json!({
                    "original_path": r.original_path.to_string_lossy(),
                    "new_path": r.new_path.to_string_lossy(),
                    "extension": r.extension,
                    "timestamp": r.timestamp,
                    "source_label": r.source_label,
                })
            })
            .collect::<Vec<_>>());
        let rendered = serde_json::to_string_pretty(&doc)
            .map_err(|e| format!("Error rendering JSON: {}", e))?;
        println!("{}", rendered);
        return Ok(());
    }

    if records.is_empty() {
        OutputFormatter::info("No relocations recorded yet.");
        return Ok(());
    }

    for record in &records {
        OutputFormatter::history_line(
            &record.timestamp,
            &record.original_path,
            &record.new_path,
            &record.source_label,
        );
    }
    Ok(())
}
