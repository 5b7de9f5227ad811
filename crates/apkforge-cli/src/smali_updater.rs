//! BuildConfig.smali field patcher

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const FIELD_VERSION_CODE: &str = "VERSION_CODE:I = ";
const FIELD_VERSION_NAME: &str = "VERSION_NAME:Ljava/lang/String; = \"";
const FIELD_APPLICATION_ID: &str = "APPLICATION_ID:Ljava/lang/String; = \"";
const FIELD_BUILD_TYPE: &str = "BUILD_TYPE:Ljava/lang/String; = \"";

/// Rewrites the constant fields of a decompiled BuildConfig.smali
pub struct SmaliUpdater {
    smali_path: PathBuf,
    lines: Vec<String>,
    old_values: HashMap<&'static str, String>,
}

impl SmaliUpdater {
    pub fn new(smali_path: PathBuf) -> Self {
        Self {
            smali_path,
            lines: Vec::new(),
            old_values: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if !self.smali_path.exists() {
            bail!(
                "BuildConfig.smali not found at {}",
                self.smali_path.display()
            );
        }
        let text = fs::read_to_string(&self.smali_path)?;
        self.lines = text.lines().map(|l| l.to_string()).collect();
        self.extract_old_values();
        Ok(())
    }

    pub fn old_values(&self) -> &HashMap<&'static str, String> {
        &self.old_values
    }

    fn extract_old_values(&mut self) {
        for line in &self.lines {
            if line.contains(FIELD_VERSION_CODE) {
                if let Some(hex) = line.split("0x").nth(1) {
                    self.old_values
                        .insert("VERSION_CODE", format!("0x{}", hex.trim()));
                }
            }
            for (field, marker) in [
                ("VERSION_NAME", FIELD_VERSION_NAME),
                ("APPLICATION_ID", FIELD_APPLICATION_ID),
                ("BUILD_TYPE", FIELD_BUILD_TYPE),
            ] {
                if line.contains(marker) {
                    if let Some(value) = parse_string_value(line) {
                        self.old_values.insert(field, value);
                    }
                }
            }
        }
    }

    /// Patch all four fields. Returns `(field, new value)` for every
    /// line actually changed.
    pub fn update_build_config(
        &mut self,
        version_code: u32,
        version_name: &str,
        application_id: &str,
        build_type: &str,
    ) -> Result<Vec<(&'static str, String)>> {
        let version_hex = format!("{:#x}", version_code);
        let mut changes = Vec::new();

        for line in &mut self.lines {
            let (updated, change) = process_line(
                line,
                &version_hex,
                version_name,
                application_id,
                build_type,
            );
            if let Some(change) = change {
                changes.push(change);
            }
            if let Some(updated) = updated {
                *line = updated;
            }
        }

        if !changes.is_empty() {
            fs::write(&self.smali_path, self.lines.join("\n") + "\n")?;
        }

        Ok(changes)
    }
}

fn process_line(
    line: &str,
    version_hex: &str,
    version_name: &str,
    application_id: &str,
    build_type: &str,
) -> (Option<String>, Option<(&'static str, String)>) {
    if line.contains(FIELD_VERSION_CODE) && line.contains("0x") {
        if let Some(prefix) = line.split("0x").next() {
            let updated = format!("{}{}", prefix, version_hex);
            if updated != line {
                return (Some(updated), Some(("VERSION_CODE", version_hex.to_string())));
            }
            return (None, None);
        }
    }

    for (field, marker, new_value) in [
        ("VERSION_NAME", FIELD_VERSION_NAME, version_name),
        ("APPLICATION_ID", FIELD_APPLICATION_ID, application_id),
        ("BUILD_TYPE", FIELD_BUILD_TYPE, build_type),
    ] {
        if line.contains(marker) {
            if let Some(updated) = replace_string_value(line, new_value) {
                if updated != line {
                    return (Some(updated), Some((field, new_value.to_string())));
                }
            }
            return (None, None);
        }
    }

    (None, None)
}

fn parse_string_value(line: &str) -> Option<String> {
    let start = line.find("= \"")? + 3;
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_string())
}

fn replace_string_value(line: &str, new_value: &str) -> Option<String> {
    let start = line.find("= \"")? + 3;
    let end = line[start..].find('"')? + start;
    Some(format!("{}{}{}", &line[..start], new_value, &line[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        ".class public final Lcom/example/BuildConfig;\n",
        ".field public static final APPLICATION_ID:Ljava/lang/String; = \"com.example.old\"\n",
        ".field public static final BUILD_TYPE:Ljava/lang/String; = \"debug\"\n",
        ".field public static final VERSION_CODE:I = 0x7\n",
        ".field public static final VERSION_NAME:Ljava/lang/String; = \"1.0.7\"\n",
    );

    fn updater_with(text: &str) -> (tempfile::TempDir, SmaliUpdater) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BuildConfig.smali");
        fs::write(&path, text).unwrap();
        let mut updater = SmaliUpdater::new(path);
        updater.load().unwrap();
        (dir, updater)
    }

    #[test]
    fn test_old_values_extracted() {
        let (_dir, updater) = updater_with(SAMPLE);
        let old = updater.old_values();
        assert_eq!(old.get("VERSION_CODE").map(String::as_str), Some("0x7"));
        assert_eq!(old.get("VERSION_NAME").map(String::as_str), Some("1.0.7"));
        assert_eq!(
            old.get("APPLICATION_ID").map(String::as_str),
            Some("com.example.old")
        );
        assert_eq!(old.get("BUILD_TYPE").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_update_patches_all_fields() {
        let (_dir, mut updater) = updater_with(SAMPLE);
        let changes = updater
            .update_build_config(42, "2.0.0", "com.example.new", "release")
            .unwrap();

        assert_eq!(changes.len(), 4);

        let text = fs::read_to_string(&updater.smali_path).unwrap();
        assert!(text.contains("VERSION_CODE:I = 0x2a"));
        assert!(text.contains("VERSION_NAME:Ljava/lang/String; = \"2.0.0\""));
        assert!(text.contains("APPLICATION_ID:Ljava/lang/String; = \"com.example.new\""));
        assert!(text.contains("BUILD_TYPE:Ljava/lang/String; = \"release\""));
    }

    #[test]
    fn test_unchanged_values_report_no_changes() {
        let (_dir, mut updater) = updater_with(SAMPLE);
        let changes = updater
            .update_build_config(7, "1.0.7", "com.example.old", "debug")
            .unwrap();
        assert!(changes.is_empty());
    }
}
