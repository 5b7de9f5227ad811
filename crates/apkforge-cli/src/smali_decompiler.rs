//! DEX to smali decompilation through baksmali

use crate::platform_utils::run_checked;
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Runs baksmali over freshly produced DEX files, placing each into
/// the smali directory layout apktool expects
pub struct SmaliDecompiler {
    baksmali_jar: PathBuf,
    modded_dir: PathBuf,
}

impl SmaliDecompiler {
    pub fn new(baksmali_jar: PathBuf, modded_dir: PathBuf) -> Self {
        Self {
            baksmali_jar,
            modded_dir,
        }
    }

    /// Decompile each DEX into `smali` / `smali_classesN`, starting at
    /// `target_dex_index`. Returns the directory names created.
    pub fn decompile(&self, dex_files: &[PathBuf], target_dex_index: usize) -> Result<Vec<String>> {
        let mut created = Vec::new();

        for (offset, dex) in dex_files.iter().enumerate() {
            let index = target_dex_index.max(1) + offset;
            let dir_name = smali_dir_name(index);
            let out_dir = self.modded_dir.join(&dir_name);

            run_checked(
                "java",
                [
                    OsString::from("-jar"),
                    self.baksmali_jar.clone().into(),
                    OsString::from("d"),
                    dex.as_os_str().to_os_string(),
                    OsString::from("-o"),
                    out_dir.into_os_string(),
                ],
                "baksmali",
            )?;

            created.push(dir_name);
        }

        Ok(created)
    }

    pub fn modded_dir(&self) -> &Path {
        &self.modded_dir
    }
}

/// apktool's naming: the first DEX maps to `smali`, later ones to
/// `smali_classesN`
pub fn smali_dir_name(index: usize) -> String {
    if index <= 1 {
        "smali".to_string()
    } else {
        format!("smali_classes{}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smali_dir_naming() {
        assert_eq!(smali_dir_name(0), "smali");
        assert_eq!(smali_dir_name(1), "smali");
        assert_eq!(smali_dir_name(2), "smali_classes2");
        assert_eq!(smali_dir_name(5), "smali_classes5");
    }
}
