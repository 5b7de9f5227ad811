//! Temporary file and directory cleanup

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Removes build intermediates, tolerating paths that are already gone
pub struct FileCleaner;

impl FileCleaner {
    pub fn new() -> Self {
        Self
    }

    pub fn cleanup_temp_dirs(&self, temp_dirs: &[PathBuf]) {
        for dir in temp_dirs {
            self.remove_path(dir);
        }
    }

    pub fn cleanup_temp_files(&self, temp_files: &[PathBuf]) {
        for file in temp_files {
            self.remove_path(file);
        }
    }

    /// Remove direct children of `directory` whose names match
    /// `pattern` (a literal name, or `*.ext` for an extension match)
    pub fn cleanup_by_pattern(&self, directory: &Path, pattern: &str) {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            if matches_pattern(&name.to_string_lossy(), pattern) {
                self.remove_path(&entry.path());
            }
        }
    }

    fn remove_path(&self, path: &Path) {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else if path.exists() {
            fs::remove_file(path)
        } else {
            return;
        };

        match result {
            Ok(()) => debug!(path = %path.display(), "removed"),
            Err(err) => warn!(path = %path.display(), %err, "could not clean up"),
        }
    }
}

impl Default for FileCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => name == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_mixed_paths() {
        let dir = tempfile::tempdir().unwrap();
        let temp_dir = dir.path().join("temp_classes");
        let temp_file = dir.path().join("temp.jar");
        fs::create_dir_all(&temp_dir).unwrap();
        fs::write(&temp_file, b"zip").unwrap();

        let cleaner = FileCleaner::new();
        cleaner.cleanup_temp_dirs(&[temp_dir.clone()]);
        cleaner.cleanup_temp_files(&[temp_file.clone(), dir.path().join("already_gone")]);

        assert!(!temp_dir.exists());
        assert!(!temp_file.exists());
    }

    #[test]
    fn test_cleanup_by_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("unsigned.apk"), b"").unwrap();
        fs::write(dir.path().join("aligned.apk"), b"").unwrap();
        fs::write(dir.path().join("keep.txt"), b"").unwrap();

        FileCleaner::new().cleanup_by_pattern(dir.path(), "*.apk");

        assert!(!dir.path().join("unsigned.apk").exists());
        assert!(!dir.path().join("aligned.apk").exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_pattern_matching() {
        assert!(matches_pattern("a.apk", "*.apk"));
        assert!(matches_pattern("temp.jar", "temp.jar"));
        assert!(!matches_pattern("a.apks", "*.apk"));
    }
}
