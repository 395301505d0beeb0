/// Post-run removal of empty directories.
///
/// After relocation, source directories are often left hollow. The reaper
/// walks the tree bottom-up so that removing children can empty out parents,
/// which are then removed in the same pass.
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Removes every directory under `root` that is empty at inspection time.
///
/// `root` itself is never removed, and neither is any directory under one of
/// the `exclusions` (absolute-prefix match). Directories that fail to be
/// removed (became non-empty, permissions) are simply left in place; the
/// pass never fails as a whole. Returns the number of directories removed.
pub fn reap(root: &Path, exclusions: &[PathBuf]) -> usize {
    let root_abs = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut removed = 0;

    for entry in WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if abs == root_abs {
            continue;
        }
        if is_excluded(&abs, exclusions) {
            continue;
        }
        if is_empty_dir(path) && fs::remove_dir(path).is_ok() {
            removed += 1;
        }
    }

    removed
}

/// True when `path` lies under any exclusion prefix.
fn is_excluded(path: &Path, exclusions: &[PathBuf]) -> bool {
    exclusions.iter().any(|exc| path.starts_with(exc))
}

/// True when the directory holds no entries at all.
fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_nested_empty_directories_all_removed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c")).expect("Failed to create dirs");
        fs::create_dir_all(root.join("d")).expect("Failed to create dirs");

        let removed = reap(root, &[]);

        assert_eq!(removed, 4);
        assert!(root.exists());
        assert!(!root.join("a").exists());
        assert!(!root.join("d").exists());
    }

    #[test]
    fn test_non_empty_directories_survive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("keep/inner")).expect("Failed to create dirs");
        fs::write(root.join("keep/inner/file.txt"), "x").expect("Failed to write file");
        fs::create_dir(root.join("hollow")).expect("Failed to create dir");

        reap(root, &[]);

        assert!(root.join("keep/inner/file.txt").exists());
        assert!(!root.join("hollow").exists());
    }

    #[test]
    fn test_children_empty_out_parents_in_one_pass() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        // Parent contains only empty children; removing them must cascade.
        fs::create_dir_all(root.join("parent/child1")).expect("Failed to create dirs");
        fs::create_dir_all(root.join("parent/child2")).expect("Failed to create dirs");

        let removed = reap(root, &[]);

        assert_eq!(removed, 3);
        assert!(!root.join("parent").exists());
    }

    #[test]
    fn test_excluded_directories_left_alone() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("excluded/empty")).expect("Failed to create dirs");
        fs::create_dir(root.join("other")).expect("Failed to create dir");

        let exclusion = root
            .join("excluded")
            .canonicalize()
            .expect("Failed to canonicalize");
        reap(root, &[exclusion]);

        assert!(root.join("excluded/empty").exists());
        assert!(!root.join("other").exists());
    }
}
