//! ABI directory filtering under the decompiled `lib/` tree

use anyhow::Result;
use apkforge_core::{AbiSection, Diagnostics};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const ALL_ABIS: &[&str] = &[
    "armeabi",
    "armeabi-v7a",
    "arm64-v8a",
    "x86",
    "x86_64",
    "mips",
    "mips64",
];

/// Keeps only the configured ABI directories, removing the rest to
/// shrink the rebuilt APK
pub struct AbiFilter {
    lib_dir: PathBuf,
    keep: HashSet<String>,
    remove_others: bool,
    warn_if_missing: bool,
}

impl AbiFilter {
    pub fn new(modded_dir: &Path, abi: &AbiSection) -> Self {
        Self {
            lib_dir: modded_dir.join("lib"),
            keep: abi.keep_only.iter().cloned().collect(),
            remove_others: abi.remove_others,
            warn_if_missing: abi.warn_if_missing,
        }
    }

    /// Apply the filter. Returns the ABI directories kept.
    pub fn filter(&self, diagnostics: &mut Diagnostics) -> Result<Vec<PathBuf>> {
        if !self.lib_dir.exists() {
            println!("  No lib directory found, skipping ABI filter");
            return Ok(Vec::new());
        }
        if self.keep.is_empty() {
            println!("  No ABI filter specified, keeping all");
            return Ok(Vec::new());
        }

        let abi_dirs = self.find_abi_directories()?;
        if abi_dirs.is_empty() {
            println!("    No ABI directories found");
            return Ok(Vec::new());
        }

        if self.warn_if_missing {
            let existing: HashSet<&str> = abi_dirs
                .iter()
                .filter_map(|d| d.file_name().and_then(|n| n.to_str()))
                .collect();
            let missing: Vec<&str> = self
                .keep
                .iter()
                .map(String::as_str)
                .filter(|abi| !existing.contains(abi))
                .collect();
            if !missing.is_empty() {
                diagnostics.warn(format!(
                    "requested ABIs not found: {}",
                    missing.join(", ")
                ));
            }
        }

        let mut kept = Vec::new();
        let mut removed = Vec::new();

        for abi_dir in abi_dirs {
            let name = abi_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            if self.keep.contains(&name) {
                println!("    [OK] Keeping: {}", name);
                kept.push(abi_dir);
            } else if self.remove_others {
                let (files, size_kb) = dir_stats(&abi_dir);
                fs::remove_dir_all(&abi_dir)?;
                println!("    Removed: {} ({} files, {:.1} KB)", name, files, size_kb);
                removed.push(name);
            } else {
                println!("    Keeping (configured to keep all): {}", name);
                kept.push(abi_dir);
            }
        }

        Ok(kept)
    }

    fn find_abi_directories(&self) -> Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.lib_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| ALL_ABIS.contains(&n))
            })
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

fn dir_stats(dir: &Path) -> (usize, f64) {
    let mut files = 0;
    let mut bytes = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            files += 1;
            bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    (files, bytes as f64 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi_section(keep: &[&str]) -> AbiSection {
        AbiSection {
            keep_only: keep.iter().map(|s| s.to_string()).collect(),
            remove_others: true,
            warn_if_missing: true,
        }
    }

    fn setup(abis: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for abi in abis {
            let abi_dir = dir.path().join("lib").join(abi);
            fs::create_dir_all(&abi_dir).unwrap();
            fs::write(abi_dir.join("libgame.so"), b"elf").unwrap();
        }
        dir
    }

    #[test]
    fn test_keeps_configured_abis_removes_rest() {
        let dir = setup(&["arm64-v8a", "armeabi-v7a", "x86"]);
        let filter = AbiFilter::new(dir.path(), &abi_section(&["arm64-v8a"]));
        let mut diagnostics = Diagnostics::new();

        let kept = filter.filter(&mut diagnostics).unwrap();

        assert_eq!(kept.len(), 1);
        assert!(dir.path().join("lib/arm64-v8a").exists());
        assert!(!dir.path().join("lib/x86").exists());
        assert!(!dir.path().join("lib/armeabi-v7a").exists());
        assert!(!diagnostics.has_warnings());
    }

    #[test]
    fn test_missing_requested_abi_warns() {
        let dir = setup(&["x86"]);
        let filter = AbiFilter::new(dir.path(), &abi_section(&["arm64-v8a"]));
        let mut diagnostics = Diagnostics::new();

        filter.filter(&mut diagnostics).unwrap();

        assert!(diagnostics.has_warnings());
        assert!(diagnostics.warnings()[0].contains("arm64-v8a"));
    }

    #[test]
    fn test_no_filter_configured_keeps_everything() {
        let dir = setup(&["x86", "arm64-v8a"]);
        let filter = AbiFilter::new(dir.path(), &abi_section(&[]));
        let mut diagnostics = Diagnostics::new();

        let kept = filter.filter(&mut diagnostics).unwrap();

        assert!(kept.is_empty());
        assert!(dir.path().join("lib/x86").exists());
    }

    #[test]
    fn test_non_abi_directories_ignored() {
        let dir = setup(&["arm64-v8a"]);
        fs::create_dir_all(dir.path().join("lib/notes")).unwrap();

        let filter = AbiFilter::new(dir.path(), &abi_section(&["arm64-v8a"]));
        let mut diagnostics = Diagnostics::new();
        filter.filter(&mut diagnostics).unwrap();

        assert!(dir.path().join("lib/notes").exists());
    }
}
