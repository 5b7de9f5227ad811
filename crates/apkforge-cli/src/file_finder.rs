//! Locating the tool JARs and the source APK

use anyhow::{bail, Result};
use apkforge_core::PathTable;
use std::fs;
use std::path::PathBuf;

/// Everything `find_tools` must produce before decompilation can start
#[derive(Debug, Clone)]
pub struct FoundTools {
    pub apktool_jar: PathBuf,
    pub baksmali_jar: Option<PathBuf>,
    pub smali_jar: Option<PathBuf>,
    pub source_apk: PathBuf,
}

/// Validates configured tool paths and finds the source APK
pub struct FileFinder<'a> {
    paths: &'a PathTable,
}

impl<'a> FileFinder<'a> {
    pub fn new(paths: &'a PathTable) -> Self {
        Self { paths }
    }

    pub fn find_all(&self) -> Result<FoundTools> {
        println!("  Searching for required files...");

        let apktool_jar = match &self.paths.apktool_jar {
            Some(path) if path.exists() => path.clone(),
            Some(path) => bail!("configured apktool jar not found: {}", path.display()),
            None => bail!("no apktool jar configured (paths.tools.apktool)"),
        };

        let baksmali_jar = self.optional_tool(&self.paths.baksmali_jar, "baksmali");
        let smali_jar = self.optional_tool(&self.paths.smali_jar, "smali");

        let source_apk = self.find_source_apk()?;

        Ok(FoundTools {
            apktool_jar,
            baksmali_jar,
            smali_jar,
            source_apk,
        })
    }

    fn optional_tool(&self, configured: &Option<PathBuf>, label: &str) -> Option<PathBuf> {
        match configured {
            Some(path) if path.exists() => Some(path.clone()),
            Some(path) => {
                println!(
                    "  [Warning] Configured {} not found: {}",
                    label,
                    path.display()
                );
                None
            }
            None => None,
        }
    }

    /// First APK in the original-game directory
    fn find_source_apk(&self) -> Result<PathBuf> {
        let original_dir = &self.paths.original_dir;
        if !original_dir.exists() {
            bail!(
                "original game directory not found: {}",
                original_dir.display()
            );
        }

        let mut apks: Vec<PathBuf> = fs::read_dir(original_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "apk"))
            .collect();
        apks.sort();

        match apks.into_iter().next() {
            Some(apk) => {
                println!("    Found source APK: {}", apk.display());
                Ok(apk)
            }
            None => bail!("no APK files found in {}", original_dir.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge_core::config::PathsSection;
    use std::path::Path;

    fn table(root: &Path) -> PathTable {
        let mut paths = PathsSection::default();
        paths.tools.apktool = Some("tools/apktool.jar".to_string());
        PathTable::resolve(root, &paths)
    }

    #[test]
    fn test_finds_tools_and_apk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tools")).unwrap();
        fs::write(dir.path().join("tools/apktool.jar"), b"").unwrap();
        fs::create_dir_all(dir.path().join("OriginalGame")).unwrap();
        fs::write(dir.path().join("OriginalGame/game.apk"), b"").unwrap();

        let table = table(dir.path());
        let found = FileFinder::new(&table).find_all().unwrap();

        assert!(found.apktool_jar.ends_with("apktool.jar"));
        assert!(found.source_apk.ends_with("game.apk"));
        assert!(found.baksmali_jar.is_none());
    }

    #[test]
    fn test_missing_source_apk_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tools")).unwrap();
        fs::write(dir.path().join("tools/apktool.jar"), b"").unwrap();
        fs::create_dir_all(dir.path().join("OriginalGame")).unwrap();

        let table = table(dir.path());
        assert!(FileFinder::new(&table).find_all().is_err());
    }

    #[test]
    fn test_missing_apktool_errors() {
        let dir = tempfile::tempdir().unwrap();
        let table = table(dir.path());
        assert!(FileFinder::new(&table).find_all().is_err());
    }
}
