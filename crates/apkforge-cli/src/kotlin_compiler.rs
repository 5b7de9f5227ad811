//! kotlinc wrapper

use crate::platform_utils::{find_executable, run_checked};
use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Compiles the project's Kotlin sources
pub struct KotlinCompiler;

impl KotlinCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `files` into `classes_dir`. Previously compiled Java
    /// classes are placed on the classpath so mixed sources link.
    pub fn compile(
        &self,
        files: &[PathBuf],
        classpath: &str,
        classes_dir: &Path,
    ) -> Result<()> {
        let kotlinc = find_executable("kotlinc")
            .ok_or_else(|| anyhow!("kotlinc not found on PATH"))?;

        fs::create_dir_all(classes_dir)?;

        let full_classpath = format!(
            "{}{}{}",
            classpath,
            classpath_separator(),
            classes_dir.display()
        );

        let mut args = vec![
            OsString::from("-cp"),
            OsString::from(full_classpath),
            OsString::from("-d"),
            classes_dir.as_os_str().to_os_string(),
            OsString::from("-jvm-target"),
            OsString::from("1.8"),
        ];
        args.extend(files.iter().map(|f| f.as_os_str().to_os_string()));

        run_checked(&kotlinc, args, "kotlinc")?;
        Ok(())
    }
}

impl Default for KotlinCompiler {
    fn default() -> Self {
        Self::new()
    }
}

fn classpath_separator() -> char {
    if cfg!(target_os = "windows") {
        ';'
    } else {
        ':'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classpath_separator_matches_platform() {
        if cfg!(target_os = "windows") {
            assert_eq!(classpath_separator(), ';');
        } else {
            assert_eq!(classpath_separator(), ':');
        }
    }
}
