/// Durable audit log backed by SQLite.
///
/// This module owns the two persistent tables of the system: `relocations`,
/// an append-only record of every successful file move, and
/// `processed_folders`, an upsert-by-path marker of completed runs.
///
/// Schema upgrades are driven by an explicit version number stored in
/// SQLite's `user_version` pragma and a fixed, ordered list of additive
/// migration steps. Each step runs together with its version bump inside one
/// transaction, so an interrupted upgrade leaves either the old or the new
/// version on disk, never a half-applied step, and existing rows are never
/// dropped.
use chrono::Local;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Default store filename, created alongside the running process.
pub const DEFAULT_FILENAME: &str = "dirsift_logs.db";

/// Current schema version; `MIGRATIONS` must have exactly this many steps.
const SCHEMA_VERSION: i64 = 2;

/// Ordered migration steps. Index `i` upgrades a version-`i` database to
/// version `i + 1`. Steps are strictly additive.
const MIGRATIONS: [&str; SCHEMA_VERSION as usize] = [
    // v0 -> v1: base tables. An older pre-versioning database that already
    // has these tables passes through untouched.
    r#"
    CREATE TABLE IF NOT EXISTS relocations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_path TEXT NOT NULL,
        new_path TEXT NOT NULL,
        extension TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS processed_folders (
        folder_path TEXT PRIMARY KEY,
        last_run TEXT NOT NULL
    );
    "#,
    // v1 -> v2: relocation records carry the date-inference source label.
    "ALTER TABLE relocations ADD COLUMN source_label TEXT",
];

/// One successful file move, as recorded durably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationRecord {
    /// Path of the file before the move.
    pub original_path: PathBuf,
    /// Path of the file after the move.
    pub new_path: PathBuf,
    /// Lowercased extension with leading dot ("" when the file had none).
    pub extension: String,
    /// Local timestamp of the move, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Label of the date-inference strategy used for the destination.
    pub source_label: String,
}

impl RelocationRecord {
    /// Builds a record stamped with the current local time.
    pub fn new(
        original_path: PathBuf,
        new_path: PathBuf,
        extension: String,
        source_label: String,
    ) -> Self {
        Self {
            original_path,
            new_path,
            extension,
            timestamp: now_stamp(),
            source_label,
        }
    }
}

/// Errors raised by the audit log.
#[derive(Debug)]
pub enum AuditError {
    /// The store could not be opened or created.
    OpenFailed {
        path: PathBuf,
        source: rusqlite::Error,
    },
    /// A schema migration step failed; the log cannot be trusted.
    Migration {
        from_version: i64,
        source: rusqlite::Error,
    },
    /// A read or write against the store failed.
    Storage(rusqlite::Error),
}

impl std::fmt::Display for AuditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditError::OpenFailed { path, source } => {
                write!(f, "Failed to open audit log {}: {}", path.display(), source)
            }
            AuditError::Migration {
                from_version,
                source,
            } => {
                write!(
                    f,
                    "Audit log schema migration from version {} failed: {}",
                    from_version, source
                )
            }
            AuditError::Storage(source) => write!(f, "Audit log storage error: {}", source),
        }
    }
}

impl std::error::Error for AuditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuditError::OpenFailed { source, .. } => Some(source),
            AuditError::Migration { source, .. } => Some(source),
            AuditError::Storage(source) => Some(source),
        }
    }
}

impl From<rusqlite::Error> for AuditError {
    fn from(source: rusqlite::Error) -> Self {
        AuditError::Storage(source)
    }
}

/// Result type for audit log operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Append-only store of relocation records and processed-folder markers.
///
/// Open once per process and share the handle; a second concurrent writer
/// against the same file is not supported.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Opens (or creates) the store at `path` and brings its schema up to
    /// the current version.
    pub fn open(path: &Path) -> AuditResult<Self> {
        let conn = Connection::open(path).map_err(|e| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let log = Self { conn };
        log.migrate()?;
        Ok(log)
    }

    /// Opens an in-memory store. Test-only convenience.
    #[cfg(test)]
    pub fn open_in_memory() -> AuditResult<Self> {
        let conn = Connection::open_in_memory().map_err(AuditError::Storage)?;
        let log = Self { conn };
        log.migrate()?;
        Ok(log)
    }

    /// Applies all pending migration steps, bumping `user_version` with each.
    fn migrate(&self) -> AuditResult<()> {
        let mut version = self.schema_version()?;
        while version < SCHEMA_VERSION {
            let step = MIGRATIONS[version as usize];
            let apply = || -> rusqlite::Result<()> {
                self.conn.execute_batch("BEGIN")?;
                self.conn.execute_batch(step)?;
                self.conn
                    .pragma_update(None, "user_version", version + 1)?;
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            };
            if let Err(e) = apply() {
                let _ = self.conn.execute_batch("ROLLBACK");
                return Err(AuditError::Migration {
                    from_version: version,
                    source: e,
                });
            }
            version += 1;
        }
        Ok(())
    }

    /// Reads the stored schema version.
    fn schema_version(&self) -> AuditResult<i64> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Appends a relocation record. Storage errors propagate; the caller
    /// must treat them as fatal since durability is the whole point.
    pub fn record(&self, record: &RelocationRecord) -> AuditResult<()> {
        self.conn.execute(
            "INSERT INTO relocations (original_path, new_path, extension, timestamp, source_label)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.original_path.to_string_lossy(),
                record.new_path.to_string_lossy(),
                record.extension,
                record.timestamp,
                record.source_label,
            ],
        )?;
        Ok(())
    }

    /// Upserts the processed marker for a folder, overwriting the last-run
    /// timestamp. The folder path is stored in absolute form.
    pub fn mark_processed(&self, folder: &Path) -> AuditResult<()> {
        self.conn.execute(
            "INSERT INTO processed_folders (folder_path, last_run) VALUES (?1, ?2)
             ON CONFLICT(folder_path) DO UPDATE SET last_run = excluded.last_run",
            params![absolute_key(folder), now_stamp()],
        )?;
        Ok(())
    }

    /// Returns true when the folder has a processed marker.
    pub fn is_processed(&self, folder: &Path) -> AuditResult<bool> {
        let result = self.conn.query_row(
            "SELECT 1 FROM processed_folders WHERE folder_path = ?1",
            params![absolute_key(folder)],
            |_| Ok(()),
        );
        match result {
            Ok(()) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(AuditError::Storage(e)),
        }
    }

    /// Returns the last-run timestamp of a processed folder, if any.
    pub fn last_run(&self, folder: &Path) -> AuditResult<Option<String>> {
        let result = self.conn.query_row(
            "SELECT last_run FROM processed_folders WHERE folder_path = ?1",
            params![absolute_key(folder)],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(stamp) => Ok(Some(stamp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AuditError::Storage(e)),
        }
    }

    /// Returns the most recent relocation records, newest first.
    pub fn recent_records(&self, limit: usize) -> AuditResult<Vec<RelocationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT original_path, new_path, extension, timestamp, COALESCE(source_label, '')
             FROM relocations ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RelocationRecord {
                original_path: PathBuf::from(row.get::<_, String>(0)?),
                new_path: PathBuf::from(row.get::<_, String>(1)?),
                extension: row.get(2)?,
                timestamp: row.get(3)?,
                source_label: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(AuditError::Storage)
    }

    /// Total number of relocation records in the store.
    pub fn record_count(&self) -> AuditResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM relocations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Canonical string key for a folder path: absolute where possible.
fn absolute_key(folder: &Path) -> String {
    match folder.canonicalize() {
        Ok(abs) => abs.to_string_lossy().to_string(),
        Err(_) => folder.to_string_lossy().to_string(),
    }
}

/// Local wall-clock timestamp in `YYYY-MM-DD HH:MM:SS` format.
fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
