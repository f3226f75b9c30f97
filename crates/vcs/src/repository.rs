//! Locating git repositories on disk.

use std::path::{Path, PathBuf};

/// Name of the per-repository metadata entry (a directory, or a file for
/// worktrees and submodules).
pub const GIT_DIR: &str = ".git";

/// Find the root of the repository containing `path`.
///
/// `path` may be a file or a directory and need not exist; the search starts
/// at the nearest existing ancestor and walks upwards.
#[must_use]
pub fn find_root(path: &Path) -> Option<PathBuf> {
    let start = if path.is_dir() { Some(path) } else { path.parent() };
    start?
        .ancestors()
        .find(|dir| dir.join(GIT_DIR).exists())
        .map(Path::to_path_buf)
}

/// Whether `dir` is a directory inside a git repository.
#[must_use]
pub fn is_versioned_directory(dir: &Path) -> bool {
    dir.is_dir() && find_root(dir).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_root_from_nested_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(GIT_DIR)).unwrap();
        let nested = temp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let file = nested.join("lib.rs");
        assert_eq!(find_root(&file), Some(temp.path().to_path_buf()));
        assert_eq!(find_root(&nested), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_git_file_marks_worktree_root() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(GIT_DIR), "gitdir: /elsewhere\n").unwrap();
        assert_eq!(find_root(temp.path()), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_no_repository() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("plain");
        fs::create_dir(&dir).unwrap();
        // A tempdir may itself live under a repository; only assert when it doesn't
        if find_root(temp.path()).is_none() {
            assert!(!is_versioned_directory(&dir));
        }
        assert!(!is_versioned_directory(&dir.join("missing")));
    }

    #[test]
    fn test_is_versioned_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(GIT_DIR)).unwrap();
        assert!(is_versioned_directory(temp.path()));
        let file = temp.path().join("README");
        fs::write(&file, "hi").unwrap();
        assert!(!is_versioned_directory(&file));
    }
}
