//! Apktool build wrapper with the multidex-attribute retry

use crate::platform_utils::{run_checked, run_command, truncate_error};
use anyhow::{bail, Result};
use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runs `apktool b` over the decompiled tree
pub struct ApkBuilder {
    apktool_jar: PathBuf,
}

impl ApkBuilder {
    pub fn new(apktool_jar: PathBuf) -> Self {
        Self { apktool_jar }
    }

    pub fn build(&self, modded_dir: &Path, output_apk: &Path) -> Result<()> {
        info!("building APK with apktool");

        let args = self.command_args(modded_dir, output_apk);
        let output = run_command("java", &args)?;

        if !output.success() && output.stderr.contains("android:multiDexEnabled") {
            // some apktool versions reject the attribute on rebuild;
            // drop it from the manifest and try once more
            println!("  [WARNING] Detected multiDexEnabled error, trying alternative approach...");
            let manifest = modded_dir.join("AndroidManifest.xml");
            if manifest.exists() {
                remove_multidex_attribute(&manifest)?;
                println!("  Removed multiDexEnabled attribute, retrying build...");
                run_checked("java", &args, "apktool build (after removing multidex)")?;
                return Ok(());
            }
        }

        if !output.success() {
            bail!(
                "apktool build failed: {}",
                truncate_error(output.error_output())
            );
        }

        Ok(())
    }

    fn command_args(&self, modded_dir: &Path, output_apk: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-jar"),
            self.apktool_jar.clone().into(),
            OsString::from("b"),
            modded_dir.to_path_buf().into(),
            OsString::from("-o"),
            output_apk.to_path_buf().into(),
        ]
    }
}

fn remove_multidex_attribute(manifest_path: &Path) -> Result<()> {
    let content = fs::read_to_string(manifest_path)?;
    let re = Regex::new(r#"\s+(?:android:)?multiDexEnabled="true""#)?;
    let cleaned = re.replace_all(&content, "");
    fs::write(manifest_path, cleaned.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_multidex_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        fs::write(
            &manifest,
            r#"<application android:label="App" android:multiDexEnabled="true" android:icon="@mipmap/ic">"#,
        )
        .unwrap();

        remove_multidex_attribute(&manifest).unwrap();

        let cleaned = fs::read_to_string(&manifest).unwrap();
        assert!(!cleaned.contains("multiDexEnabled"));
        assert!(cleaned.contains(r#"android:label="App""#));
        assert!(cleaned.contains(r#"android:icon="@mipmap/ic""#));
    }

    #[test]
    fn test_command_shape() {
        let builder = ApkBuilder::new(PathBuf::from("/tools/apktool.jar"));
        let args = builder.command_args(Path::new("/work/ModdedGame"), Path::new("/work/unsigned.apk"));
        assert_eq!(args[2], "b");
        assert_eq!(args[4], "-o");
        assert_eq!(args[5], "/work/unsigned.apk");
    }
}
