/// Relocation engine: the orchestrator of an organize run.
///
/// Walks a directory tree, fingerprints every discovered file, deletes
/// byte-identical duplicates, classifies the survivors into the
/// category/date hierarchy, moves them collision-safely, and records each
/// move in the audit log. Per-file failures are isolated: they become
/// entries in the run report and never abort the run. Only an invalid root
/// or an audit-log write failure is fatal.
use crate::audit::{AuditError, AuditLog, RelocationRecord, DEFAULT_FILENAME};
use crate::category::CategoryMap;
use crate::config::CompiledFilters;
use crate::date::{DateExtractor, DateSource};
use crate::reaper;
use filetime::FileTime;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Caller-supplied knobs for one organize run.
#[derive(Debug, Default)]
pub struct OrganizeOptions {
    /// Descend into subdirectories when discovering files. When false, only
    /// direct children of the root are considered.
    pub deep_search: bool,
    /// Sub-divide destinations by inferred year/month.
    pub use_date: bool,
    /// Directories to leave untouched (matched by absolute-path prefix).
    pub exclusions: Vec<PathBuf>,
    /// Filename-level filters from configuration.
    pub filters: CompiledFilters,
}

/// Aggregate counters for one organize run. Not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Files successfully relocated.
    pub moved: usize,
    /// Duplicate files deleted in place.
    pub deleted: usize,
    /// Kilobytes reclaimed by duplicate deletion.
    pub saved_kb: f64,
    /// Number of exclusion entries supplied for the run.
    pub skipped_folders: usize,
}

/// Outcome of a run: the statistics plus every per-file failure that was
/// isolated instead of aborting the run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub stats: RunStats,
    /// Files that could not be processed, with the reason each was skipped.
    pub failures: Vec<(PathBuf, String)>,
}

/// Fatal errors of an organize run.
///
/// Per-file I/O problems are not represented here; they land in
/// `RunReport::failures` and the run continues.
#[derive(Debug)]
pub enum OrganizeError {
    /// The root path is missing or is not a directory.
    InvalidRootPath {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The audit log could not be written; the durability guarantee is
    /// broken, so the run aborts.
    Storage(AuditError),
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrganizeError::InvalidRootPath { path, source } => {
                write!(f, "Invalid root path {}: {}", path.display(), source)
            }
            OrganizeError::Storage(source) => write!(f, "Audit log failure: {}", source),
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrganizeError::InvalidRootPath { source, .. } => Some(source),
            OrganizeError::Storage(source) => Some(source),
        }
    }
}

impl From<AuditError> for OrganizeError {
    fn from(source: AuditError) -> Self {
        OrganizeError::Storage(source)
    }
}

/// Result type for engine operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What happened to a single file inside the pipeline.
enum FileOutcome {
    /// The file was relocated; the record still has to be logged.
    Moved(RelocationRecord, String),
    /// The file duplicated earlier content and was deleted in place.
    DuplicateDeleted { size_kb: f64 },
}

/// Orchestrates organize runs against one audit log and category table.
///
/// The engine is fully synchronous: files are processed one at a time in
/// discovery order, and the progress callback is invoked inline after each
/// relocation.
pub struct RelocationEngine<'a> {
    audit: &'a AuditLog,
    categories: &'a CategoryMap,
    dates: DateExtractor,
}

impl<'a> RelocationEngine<'a> {
    pub fn new(audit: &'a AuditLog, categories: &'a CategoryMap) -> Self {
        Self {
            audit,
            categories,
            dates: DateExtractor::new(),
        }
    }

    /// Runs the full pipeline over `root` and returns the run report.
    ///
    /// `progress` is called synchronously as `(current, total, message)`
    /// after each successful relocation; the engine does not proceed to the
    /// next file until it returns.
    pub fn organize(
        &self,
        root: &Path,
        options: &OrganizeOptions,
        progress: &mut dyn FnMut(usize, usize, &str),
    ) -> OrganizeResult<RunReport> {
        if !root.is_dir() {
            return Err(OrganizeError::InvalidRootPath {
                path: root.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "root does not exist or is not a directory",
                ),
            });
        }

        let exclusions = absolutize_all(&options.exclusions);
        let files = discover_files(root, options, &exclusions);
        let total = files.len();

        let mut report = RunReport {
            stats: RunStats {
                skipped_folders: options.exclusions.len(),
                ..Default::default()
            },
            failures: Vec::new(),
        };
        let mut seen_fingerprints: HashSet<String> = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            match self.process_file(root, file, index, options, &mut seen_fingerprints) {
                Ok(FileOutcome::Moved(record, message)) => {
                    self.audit.record(&record)?;
                    report.stats.moved += 1;
                    progress(index + 1, total, &message);
                }
                Ok(FileOutcome::DuplicateDeleted { size_kb }) => {
                    report.stats.deleted += 1;
                    report.stats.saved_kb += size_kb;
                }
                Err(e) => {
                    report.failures.push((file.clone(), e.to_string()));
                }
            }
        }

        reaper::reap(root, &exclusions);
        self.audit.mark_processed(root)?;

        Ok(report)
    }

    /// Steps 1 through 6 of the per-file pipeline. Returns the outcome, or
    /// the I/O error that made this file unprocessable.
    fn process_file(
        &self,
        root: &Path,
        file: &Path,
        index: usize,
        options: &OrganizeOptions,
        seen: &mut HashSet<String>,
    ) -> std::io::Result<FileOutcome> {
        // 1. Fingerprint and deduplicate. Deleted duplicates are never
        // logged; only relocations are.
        let size = fs::metadata(file)?.len();
        let digest = crate::fingerprint::fingerprint(file)?;
        if seen.contains(&digest) {
            fs::remove_file(file)?;
            return Ok(FileOutcome::DuplicateDeleted {
                size_kb: size as f64 / 1024.0,
            });
        }
        seen.insert(digest);

        // 2. Classify by extension.
        let extension = lowercase_extension(file);
        let (category, subcategory) = self.categories.classify(&extension);

        // 3. Destination directory, optionally date-divided.
        let mut target = root.join(category);
        if !subcategory.is_empty() {
            target.push(subcategory);
        }
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (source, message) = if options.use_date {
            let inference = self.dates.extract(file)?;
            target.push(&inference.year);
            target.push(&inference.month_name);
            let label = inference.source.label();
            (
                label.to_string(),
                format!("Sorting ({}): {}", label, filename),
            )
        } else {
            (
                DateSource::CategoryOnly.label().to_string(),
                format!("Sorting: {}", filename),
            )
        };

        // 4. Make sure the destination exists.
        fs::create_dir_all(&target)?;

        // 5. Disambiguate a same-named destination with the discovery index.
        let mut destination = target.join(&filename);
        if destination.exists() {
            destination = target.join(format!("copy_{}_{}", index, filename));
        }

        // 6. Copy preserving timestamps, then delete the source. Never a
        // rename, so the move works across storage volumes.
        copy_preserving_times(file, &destination)?;
        fs::remove_file(file)?;

        Ok(FileOutcome::Moved(
            RelocationRecord::new(file.to_path_buf(), destination, extension, source),
            message,
        ))
    }
}

/// Collects the files to process, sorted by path for deterministic order.
fn discover_files(root: &Path, options: &OrganizeOptions, exclusions: &[PathBuf]) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root);
    if !options.deep_search {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            let abs = entry
                .path()
                .canonicalize()
                .unwrap_or_else(|_| entry.path().to_path_buf());
            !exclusions.iter().any(|exc| abs.starts_with(exc))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy() != DEFAULT_FILENAME)
        .filter(|e| options.filters.should_include(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Copies `src` to `dest`, carrying over access and modification times.
pub(crate) fn copy_preserving_times(src: &Path, dest: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(src)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    let atime = FileTime::from_last_access_time(&metadata);
    fs::copy(src, dest)?;
    filetime::set_file_times(dest, atime, mtime)?;
    Ok(())
}

/// Resolves every exclusion to an absolute path where possible.
fn absolutize_all(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect()
}

/// Lowercased extension with leading dot, or "" for extensionless files.
fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine_fixture() -> (AuditLog, CategoryMap) {
        (
            AuditLog::open_in_memory().expect("open failed"),
            CategoryMap::standard(),
        )
    }

    fn organize_quiet(
        engine: &RelocationEngine<'_>,
        root: &Path,
        options: &OrganizeOptions,
    ) -> RunReport {
        engine
            .organize(root, options, &mut |_, _, _| {})
            .expect("organize failed")
    }

    #[test]
    fn test_files_routed_by_category() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("report.pdf"), "pdf bytes").unwrap();
        fs::write(root.join("photo.jpg"), "jpg bytes").unwrap();
        fs::write(root.join("mystery.zzz"), "other bytes").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let report = organize_quiet(&engine, root, &OrganizeOptions::default());

        assert_eq!(report.stats.moved, 3);
        assert_eq!(report.stats.deleted, 0);
        assert!(root.join("Documents/PDF_Docs/report.pdf").exists());
        assert!(root.join("Images/JPG_Photos/photo.jpg").exists());
        assert!(root.join("Others/mystery.zzz").exists());
        assert_eq!(audit.record_count().unwrap(), 3);
    }

    #[test]
    fn test_duplicates_deleted_without_log_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        // Three byte-identical files: exactly one survives.
        fs::write(root.join("a.txt"), "identical content").unwrap();
        fs::write(root.join("b.txt"), "identical content").unwrap();
        fs::write(root.join("c.txt"), "identical content").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let report = organize_quiet(&engine, root, &OrganizeOptions::default());

        assert_eq!(report.stats.moved, 1);
        assert_eq!(report.stats.deleted, 2);
        assert!(report.stats.saved_kb > 0.0);
        // Only the surviving move hits the log.
        assert_eq!(audit.record_count().unwrap(), 1);
        assert!(root.join("Documents/Text_Files/a.txt").exists());
        assert!(!root.join("Documents/Text_Files/b.txt").exists());
    }

    #[test]
    fn test_collision_gets_disambiguated_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        // A same-named file already sits at the destination.
        fs::create_dir_all(root.join("Documents/Text_Files")).unwrap();
        fs::write(root.join("Documents/Text_Files/notes.txt"), "existing").unwrap();
        fs::write(root.join("notes.txt"), "incoming").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let options = OrganizeOptions {
            deep_search: false,
            ..Default::default()
        };
        let report = organize_quiet(&engine, root, &options);

        assert_eq!(report.stats.moved, 1);
        assert!(root.join("Documents/Text_Files/notes.txt").exists());
        assert!(root.join("Documents/Text_Files/copy_0_notes.txt").exists());
    }

    #[test]
    fn test_shallow_search_ignores_subdirectories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("nested/deep.txt"), "deep").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let report = organize_quiet(&engine, root, &OrganizeOptions::default());

        assert_eq!(report.stats.moved, 1);
        assert!(root.join("Documents/Text_Files/top.txt").exists());
        assert!(root.join("nested/deep.txt").exists());
    }

    #[test]
    fn test_deep_search_descends() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("nested/deep.txt"), "deep").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let report = organize_quiet(
            &engine,
            root,
            &OrganizeOptions {
                deep_search: true,
                ..Default::default()
            },
        );

        assert_eq!(report.stats.moved, 1);
        assert!(root.join("Documents/Text_Files/deep.txt").exists());
        // The emptied source directory is reaped in the same run.
        assert!(!root.join("nested").exists());
    }

    #[test]
    fn test_excluded_directory_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("protected")).unwrap();
        fs::write(root.join("protected/keep.txt"), "keep").unwrap();
        fs::write(root.join("move.txt"), "move").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let options = OrganizeOptions {
            deep_search: true,
            exclusions: vec![root.join("protected")],
            ..Default::default()
        };
        let report = organize_quiet(&engine, root, &options);

        assert_eq!(report.stats.moved, 1);
        assert_eq!(report.stats.skipped_folders, 1);
        assert!(root.join("protected/keep.txt").exists());
    }

    #[test]
    fn test_date_sorted_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("IMG_20220809_120000.jpg"), "photo").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let options = OrganizeOptions {
            use_date: true,
            ..Default::default()
        };
        organize_quiet(&engine, root, &options);

        assert!(root
            .join("Images/JPG_Photos/2022/August/IMG_20220809_120000.jpg")
            .exists());
        let records = audit.recent_records(1).unwrap();
        assert_eq!(records[0].source_label, "Filename (Continuous)");
    }

    #[test]
    fn test_category_only_label_without_date_sort() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("plain.txt"), "text").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        organize_quiet(&engine, root, &OrganizeOptions::default());

        let records = audit.recent_records(1).unwrap();
        assert_eq!(records[0].source_label, "Category Only");
    }

    #[test]
    fn test_invalid_root_is_fatal() {
        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let result = engine.organize(
            Path::new("/no/such/root"),
            &OrganizeOptions::default(),
            &mut |_, _, _| {},
        );
        assert!(matches!(
            result,
            Err(OrganizeError::InvalidRootPath { .. })
        ));
    }

    #[test]
    fn test_rerun_moves_nothing_and_marks_processed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("once.txt"), "once").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let options = OrganizeOptions {
            deep_search: false,
            ..Default::default()
        };

        let first = organize_quiet(&engine, root, &options);
        assert_eq!(first.stats.moved, 1);
        assert!(audit.is_processed(root).unwrap());

        // Second run: the file now lives two levels down and deep search is
        // off, so nothing is left to move.
        let second = organize_quiet(&engine, root, &options);
        assert_eq!(second.stats.moved, 0);
        assert!(audit.is_processed(root).unwrap());
    }

    #[test]
    fn test_progress_reports_moves() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("a.pdf"), "a").unwrap();
        fs::write(root.join("b.pdf"), "b").unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let mut calls: Vec<(usize, usize, String)> = Vec::new();
        engine
            .organize(root, &OrganizeOptions::default(), &mut |cur, total, msg| {
                calls.push((cur, total, msg.to_string()))
            })
            .expect("organize failed");

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, 2);
        assert!(calls[0].2.starts_with("Sorting: "));
    }

    #[test]
    fn test_empty_dirs_reaped_after_run() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("hollow/inner")).unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        let options = OrganizeOptions {
            deep_search: true,
            ..Default::default()
        };
        let report = organize_quiet(&engine, root, &options);

        assert_eq!(report.stats.moved, 0);
        assert!(root.exists());
        assert!(!root.join("hollow").exists());
    }

    #[test]
    fn test_timestamps_preserved_on_move() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let src = root.join("old.txt");
        fs::write(&src, "aged content").unwrap();
        let past = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_times(&src, past, past).unwrap();

        let (audit, categories) = engine_fixture();
        let engine = RelocationEngine::new(&audit, &categories);
        organize_quiet(&engine, root, &OrganizeOptions::default());

        let moved = root.join("Documents/Text_Files/old.txt");
        let metadata = fs::metadata(&moved).unwrap();
        let mtime = FileTime::from_last_modification_time(&metadata);
        assert_eq!(mtime.unix_seconds(), 1_600_000_000);
    }
}
