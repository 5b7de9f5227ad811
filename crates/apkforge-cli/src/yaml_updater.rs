//! apktool.yml version and filename patcher
//!
//! Line-oriented on purpose: apktool.yml carries java-class YAML tags
//! (`!!brut.androlib.meta.MetaInfo`) that a round-trip through a YAML
//! library would destroy. Only the three lines we own are rewritten.

use anyhow::{bail, Result};
use std::fs;
use std::path::PathBuf;

/// Old values read from apktool.yml before patching
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApktoolValues {
    pub version_code: Option<String>,
    pub version_name: Option<String>,
    pub apk_file_name: Option<String>,
}

pub struct YamlUpdater {
    yml_path: PathBuf,
    lines: Vec<String>,
}

impl YamlUpdater {
    pub fn new(yml_path: PathBuf) -> Self {
        Self {
            yml_path,
            lines: Vec::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if !self.yml_path.exists() {
            bail!("apktool.yml not found at {}", self.yml_path.display());
        }
        let text = fs::read_to_string(&self.yml_path)?;
        self.lines = text.lines().map(|l| l.to_string()).collect();
        Ok(())
    }

    pub fn extract_values(&self) -> ApktoolValues {
        let mut values = ApktoolValues::default();
        for line in &self.lines {
            let stripped = line.trim();
            if let Some(rest) = stripped.strip_prefix("versionCode:") {
                values.version_code = Some(clean_value(rest));
            } else if let Some(rest) = stripped.strip_prefix("versionName:") {
                values.version_name = Some(clean_value(rest));
            } else if let Some(rest) = stripped.strip_prefix("apkFileName:") {
                values.apk_file_name = Some(clean_value(rest));
            }
        }
        values
    }

    /// Rewrite versionCode/versionName/apkFileName in place. Returns
    /// the new APK file name and whether anything changed.
    pub fn update(
        &mut self,
        version_code: u32,
        version_name: &str,
        app_name: &str,
    ) -> Result<(String, bool)> {
        let new_apk_name = format!("{} ({}).apk", app_name, version_name);
        let mut updated = false;

        for line in &mut self.lines {
            let trimmed = line.trim_start();
            if trimmed.starts_with("versionCode:") {
                *line = format!("  versionCode: {}", version_code);
                updated = true;
            } else if trimmed.starts_with("versionName:") {
                *line = format!("  versionName: {}", version_name);
                updated = true;
            } else if trimmed.starts_with("apkFileName:") {
                *line = format!("  apkFileName: {}", new_apk_name);
                updated = true;
            }
        }

        if updated {
            fs::write(&self.yml_path, self.lines.join("\n") + "\n")?;
        }

        Ok((new_apk_name, updated))
    }
}

fn clean_value(raw: &str) -> String {
    raw.trim().trim_matches(['"', '\'']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "!!brut.androlib.meta.MetaInfo\napkFileName: original.apk\nversionInfo:\n  versionCode: '7'\n  versionName: 1.0.7\nsdkInfo:\n  minSdkVersion: '21'\n";

    fn updater_with(text: &str) -> (tempfile::TempDir, YamlUpdater) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apktool.yml");
        fs::write(&path, text).unwrap();
        let mut updater = YamlUpdater::new(path);
        updater.load().unwrap();
        (dir, updater)
    }

    #[test]
    fn test_extract_values() {
        let (_dir, updater) = updater_with(SAMPLE);
        let values = updater.extract_values();
        assert_eq!(values.version_code.as_deref(), Some("7"));
        assert_eq!(values.version_name.as_deref(), Some("1.0.7"));
        assert_eq!(values.apk_file_name.as_deref(), Some("original.apk"));
    }

    #[test]
    fn test_update_rewrites_only_owned_lines() {
        let (_dir, mut updater) = updater_with(SAMPLE);
        let (new_name, updated) = updater.update(42, "2.0.0", "Modded Game").unwrap();

        assert!(updated);
        assert_eq!(new_name, "Modded Game (2.0.0).apk");

        let text = fs::read_to_string(&updater.yml_path).unwrap();
        assert!(text.contains("versionCode: 42"));
        assert!(text.contains("versionName: 2.0.0"));
        assert!(text.contains("apkFileName: Modded Game (2.0.0).apk"));
        // the java-class tag survives
        assert!(text.contains("!!brut.androlib.meta.MetaInfo"));
        assert!(text.contains("minSdkVersion: '21'"));
    }

    #[test]
    fn test_missing_file_errors() {
        let mut updater = YamlUpdater::new(PathBuf::from("/nonexistent/apktool.yml"));
        assert!(updater.load().is_err());
    }
}
