//! javac wrapper

use crate::platform_utils::{find_executable, run_checked};
use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compiles the project's Java sources against the Android framework
pub struct JavaCompiler;

impl JavaCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `files` into `classes_dir`, returning the number of
    /// generated class files
    pub fn compile(&self, files: &[PathBuf], classpath: &str, classes_dir: &Path) -> Result<usize> {
        let javac =
            find_executable("javac").ok_or_else(|| anyhow!("javac not found on PATH"))?;

        fs::create_dir_all(classes_dir)?;

        // long file lists go through an @argfile to dodge command-line
        // length limits
        let argfile = write_argfile(files, classpath, classes_dir)?;
        let result = run_checked(
            &javac,
            [OsString::from(format!("@{}", argfile.display()))],
            "javac",
        );
        fs::remove_file(&argfile).ok();
        result?;

        Ok(count_class_files(classes_dir))
    }
}

impl Default for JavaCompiler {
    fn default() -> Self {
        Self::new()
    }
}

fn write_argfile(files: &[PathBuf], classpath: &str, classes_dir: &Path) -> Result<PathBuf> {
    let argfile = std::env::temp_dir().join(format!("apkforge_javac_{}.args", std::process::id()));
    let mut lines = vec![
        "-encoding".to_string(),
        "UTF-8".to_string(),
        "-cp".to_string(),
        quote(classpath),
        "-d".to_string(),
        quote(&classes_dir.display().to_string()),
    ];
    lines.extend(files.iter().map(|f| quote(&f.display().to_string())));
    fs::write(&argfile, lines.join("\n"))?;
    Ok(argfile)
}

/// javac argfiles need backslashes doubled and spaces quoted
fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\"))
}

pub fn count_class_files(classes_dir: &Path) -> usize {
    WalkDir::new(classes_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "class"))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argfile_contents() {
        let files = vec![PathBuf::from("/src/A.java"), PathBuf::from("/src/B.java")];
        let argfile = write_argfile(&files, "/sdk/android.jar", Path::new("/tmp/classes")).unwrap();
        let text = fs::read_to_string(&argfile).unwrap();
        fs::remove_file(&argfile).ok();

        assert!(text.contains("-cp"));
        assert!(text.contains("android.jar"));
        assert!(text.contains("A.java"));
        assert!(text.contains("B.java"));
    }

    #[test]
    fn test_count_class_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("com/example")).unwrap();
        fs::write(dir.path().join("com/example/Main.class"), b"").unwrap();
        fs::write(dir.path().join("com/example/Main.java"), b"").unwrap();
        assert_eq!(count_class_files(dir.path()), 1);
    }
}
