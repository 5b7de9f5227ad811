//! Custom resource merge into the decompiled tree

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Differences between the custom `res/` and the decompiled `res/`
#[derive(Debug, Default)]
pub struct ResourceDifferences {
    /// Present only in the custom tree
    pub new: Vec<PathBuf>,
    /// Present in both but with different contents
    pub updated: Vec<PathBuf>,
    /// Present only in the decompiled tree
    pub missing: Vec<PathBuf>,
}

impl ResourceDifferences {
    pub fn any(&self) -> bool {
        !(self.new.is_empty() && self.updated.is_empty() && self.missing.is_empty())
    }
}

/// Copies the project's custom resources over the decompiled ones
pub struct ResourceManager {
    source_res: PathBuf,
    target_res: PathBuf,
}

impl ResourceManager {
    pub fn new(src_dir: &Path, modded_dir: &Path) -> Self {
        Self {
            source_res: src_dir.join("main").join("res"),
            target_res: modded_dir.join("res"),
        }
    }

    /// List what a merge would change, relative to the res roots
    pub fn list_differences(&self) -> Result<ResourceDifferences> {
        let mut diff = ResourceDifferences::default();
        if !self.source_res.exists() {
            return Ok(diff);
        }

        for entry in files_under(&self.source_res) {
            let rel = entry.strip_prefix(&self.source_res)?.to_path_buf();
            let target = self.target_res.join(&rel);
            if !target.exists() {
                diff.new.push(rel);
            } else if !same_contents(&entry, &target)? {
                diff.updated.push(rel);
            }
        }

        if self.target_res.exists() {
            for entry in files_under(&self.target_res) {
                let rel = entry.strip_prefix(&self.target_res)?.to_path_buf();
                if !self.source_res.join(&rel).exists() {
                    diff.missing.push(rel);
                }
            }
        }

        Ok(diff)
    }

    /// Copy everything from the custom res tree into the target.
    /// Returns `(directories touched, files copied)`.
    pub fn merge_resources(&self) -> Result<(usize, usize)> {
        if !self.source_res.exists() {
            debug!(source = %self.source_res.display(), "no custom resources");
            return Ok((0, 0));
        }

        let mut dirs = 0;
        let mut files = 0;

        for entry in WalkDir::new(&self.source_res)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let rel = entry.path().strip_prefix(&self.source_res)?;
            if rel.as_os_str().is_empty() {
                continue;
            }
            let target = self.target_res.join(rel);

            if entry.file_type().is_dir() {
                if !target.exists() {
                    fs::create_dir_all(&target)?;
                    dirs += 1;
                }
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                files += 1;
            }
        }

        Ok((dirs, files))
    }
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = fs::metadata(a)?;
    let meta_b = fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(fs::read(a)? == fs::read(b)?)
}
