/// Pre-organize backup of a source tree.
///
/// A straightforward recursive copy to a timestamped sibling of the source
/// directory, preserving relative structure and file timestamps. The engine
/// never depends on a backup having been made; this exists so callers can
/// offer one before a destructive run.
use crate::engine::copy_preserving_times;
use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copies everything under `source` (minus exclusions) to
/// `<source>_BACKUP_<YYYYMMDD_HHMMSS>` and returns the backup path.
///
/// `progress` is called as `(current, total, message)` after each copied
/// file. Exclusions are matched by absolute-path prefix, like the engine's.
pub fn backup(
    source: &Path,
    exclusions: &[PathBuf],
    progress: &mut dyn FnMut(usize, usize, &str),
) -> io::Result<PathBuf> {
    if !source.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("backup source is not a directory: {}", source.display()),
        ));
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = sibling_with_suffix(source, &format!("_BACKUP_{}", timestamp));

    let exclusions: Vec<PathBuf> = exclusions
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect();

    let files: Vec<PathBuf> = WalkDir::new(source)
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
        .map(|e| e.path().to_path_buf())
        .collect();

    let total = files.len();
    for (index, file) in files.iter().enumerate() {
        let relative = file.strip_prefix(source).unwrap_or(file);
        let dest = backup_path.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_preserving_times(file, &dest)?;

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress(index + 1, total, &format!("Backing up: {}", name));
    }

    Ok(backup_path)
}

/// Builds `<path><suffix>` next to `path` (e.g. `/data/photos_BACKUP_x`).
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "backup".to_string());
    match path.parent() {
        Some(parent) => parent.join(format!("{}{}", name, suffix)),
        None => PathBuf::from(format!("{}{}", name, suffix)),
    }
}
