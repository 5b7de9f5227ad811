//! AndroidManifest.xml package rewrite and permission merge
//!
//! Text-level patching: apktool emits predictable single-quote-free
//! XML, so attribute rewrites and permission inserts are done with
//! regular expressions over the raw file rather than a full XML
//! round-trip (which would reformat the whole manifest).

use anyhow::{bail, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Reads package info from a decompiled manifest
pub struct ManifestManager {
    manifest_path: PathBuf,
}

impl ManifestManager {
    pub fn new(manifest_path: PathBuf) -> Self {
        Self { manifest_path }
    }

    pub fn package_name(&self) -> Option<String> {
        let content = fs::read_to_string(&self.manifest_path).ok()?;
        extract_package(&content)
    }
}

/// Rewrites the application id and merges permissions from the custom
/// manifest shipped with the project sources
pub struct ManifestUpdater {
    manifest_path: PathBuf,
    custom_manifest_path: PathBuf,
}

impl ManifestUpdater {
    pub fn new(manifest_path: PathBuf, custom_manifest_path: PathBuf) -> Self {
        Self {
            manifest_path,
            custom_manifest_path,
        }
    }

    pub fn update(&self, application_id: &str) -> Result<()> {
        if !self.manifest_path.exists() {
            bail!(
                "AndroidManifest.xml not found at {}",
                self.manifest_path.display()
            );
        }

        let mut content = fs::read_to_string(&self.manifest_path)?;

        let old_package = extract_package(&content);
        content = set_package(&content, application_id)?;

        // component names written relative to the old package keep
        // working because android: attributes referencing it are
        // rewritten to the explicit old package
        if let Some(old) = old_package.as_deref() {
            if old != application_id {
                content = qualify_component_names(&content, old)?;
            }
        }

        if self.custom_manifest_path.exists() {
            let custom = fs::read_to_string(&self.custom_manifest_path)?;
            content = merge_permissions(&content, &custom)?;
        }

        fs::write(&self.manifest_path, content)?;
        Ok(())
    }
}

fn extract_package(content: &str) -> Option<String> {
    let re = Regex::new(r#"<manifest[^>]*\bpackage="([^"]+)""#).ok()?;
    re.captures(content)
        .map(|caps| caps[1].to_string())
}

fn set_package(content: &str, application_id: &str) -> Result<String> {
    let re = Regex::new(r#"(<manifest[^>]*\bpackage=")[^"]+(")"#)?;
    if !re.is_match(content) {
        bail!("manifest has no package attribute");
    }
    Ok(re
        .replace(content, format!("${{1}}{}${{2}}", application_id))
        .into_owned())
}

/// Turn `android:name=".Foo"` into `android:name="old.package.Foo"` so
/// renamed packages don't orphan their components
fn qualify_component_names(content: &str, old_package: &str) -> Result<String> {
    let re = Regex::new(r#"(android:name=")\.([^"]+")"#)?;
    Ok(re
        .replace_all(content, format!("${{1}}{}.${{2}}", old_package))
        .into_owned())
}

/// Copy `<uses-permission/>` lines from the custom manifest that the
/// target does not already declare
fn merge_permissions(content: &str, custom: &str) -> Result<String> {
    let perm_re = Regex::new(r#"<uses-permission\s+android:name="([^"]+)"\s*/>"#)?;

    let existing: HashSet<String> = perm_re
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect();

    let missing: Vec<String> = perm_re
        .captures_iter(custom)
        .filter(|caps| !existing.contains(&caps[1]))
        .map(|caps| caps[0].to_string())
        .collect();

    if missing.is_empty() {
        return Ok(content.to_string());
    }

    let insert = missing
        .iter()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n");

    match content.find("</manifest>") {
        Some(pos) => Ok(format!(
            "{}{}\n{}",
            &content[..pos],
            insert,
            &content[pos..]
        )),
        None => bail!("manifest has no closing tag"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = concat!(
        "<manifest xmlns:android=\"http://schemas.android.com/apk/res/android\" package=\"com.example.old\">\n",
        "    <uses-permission android:name=\"android.permission.INTERNET\"/>\n",
        "    <application android:label=\"App\">\n",
        "        <activity android:name=\".MainActivity\"/>\n",
        "    </application>\n",
        "</manifest>\n",
    );

    #[test]
    fn test_extract_package() {
        assert_eq!(extract_package(MANIFEST).as_deref(), Some("com.example.old"));
    }

    #[test]
    fn test_set_package() {
        let updated = set_package(MANIFEST, "com.example.new").unwrap();
        assert!(updated.contains("package=\"com.example.new\""));
        assert!(!updated.contains("package=\"com.example.old\""));
    }

    #[test]
    fn test_relative_component_names_qualified() {
        let updated = qualify_component_names(MANIFEST, "com.example.old").unwrap();
        assert!(updated.contains("android:name=\"com.example.old.MainActivity\""));
    }

    #[test]
    fn test_merge_permissions_adds_only_missing() {
        let custom = concat!(
            "<manifest package=\"x\">\n",
            "    <uses-permission android:name=\"android.permission.INTERNET\"/>\n",
            "    <uses-permission android:name=\"android.permission.VIBRATE\"/>\n",
            "</manifest>\n",
        );

        let merged = merge_permissions(MANIFEST, custom).unwrap();
        assert!(merged.contains("android.permission.VIBRATE"));
        assert_eq!(merged.matches("android.permission.INTERNET").count(), 1);
    }

    #[test]
    fn test_full_update_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        let custom = dir.path().join("custom.xml");
        fs::write(&manifest, MANIFEST).unwrap();
        fs::write(
            &custom,
            "<manifest><uses-permission android:name=\"android.permission.WAKE_LOCK\"/></manifest>",
        )
        .unwrap();

        ManifestUpdater::new(manifest.clone(), custom)
            .update("com.example.new")
            .unwrap();

        let text = fs::read_to_string(&manifest).unwrap();
        assert!(text.contains("package=\"com.example.new\""));
        assert!(text.contains("android.permission.WAKE_LOCK"));
        assert!(text.contains("com.example.old.MainActivity"));
    }
}
