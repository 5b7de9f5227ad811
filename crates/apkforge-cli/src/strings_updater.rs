//! strings.xml app-name patcher

use anyhow::Result;
use regex::Regex;
use std::fs;
use std::path::PathBuf;

/// Keys different build systems use for the launcher label
const APP_NAME_KEYS: &[&str] = &[
    "app_name",
    "game_name",
    "godot_project_name_string",
    "project_name_string",
    "application_name",
    "app_title",
    "app_display_name",
];

/// Updates (or inserts) the application display name in strings.xml
pub struct StringsUpdater {
    strings_path: PathBuf,
    old_app_name: Option<String>,
}

impl StringsUpdater {
    pub fn new(strings_path: PathBuf) -> Self {
        Self {
            strings_path,
            old_app_name: None,
        }
    }

    pub fn old_app_name(&self) -> Option<&str> {
        self.old_app_name.as_deref()
    }

    /// Returns a human-readable status message on success
    pub fn update_app_name(&mut self, new_app_name: &str) -> Result<String> {
        if !self.strings_path.exists() {
            anyhow::bail!("strings.xml not found at {}", self.strings_path.display());
        }

        let content = fs::read_to_string(&self.strings_path)?;

        let found = APP_NAME_KEYS.iter().find_map(|key| {
            let re = tag_regex(key).ok()?;
            re.captures(&content)
                .map(|caps| (*key, caps.get(1).map(|m| m.as_str().to_string())))
        });

        let (key, old_value) = match found {
            Some((key, old_value)) => (key, old_value),
            None => {
                // no known tag; append one before </resources>
                let tag = format!(
                    "    <string name=\"app_name\">{}</string>",
                    new_app_name
                );
                let new_content = if content.contains("</resources>") {
                    content.replace("</resources>", &format!("{}\n</resources>", tag))
                } else {
                    format!("{}\n{}\n", content, tag)
                };
                fs::write(&self.strings_path, new_content)?;
                return Ok(format!("Added app_name tag with value: '{}'", new_app_name));
            }
        };

        let old_clean = old_value
            .as_deref()
            .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        self.old_app_name = old_value;

        if old_clean == new_app_name {
            return Ok(format!(
                "app_name already set to '{}' (using key: {})",
                new_app_name, key
            ));
        }

        let re = tag_regex(key)?;
        let replacement = format!("<string name=\"{}\">{}</string>", key, new_app_name);
        let new_content = re.replace(&content, replacement.as_str());
        fs::write(&self.strings_path, new_content.as_bytes())?;

        Ok(format!(
            "Updated app_name from '{}' to '{}' (key: {})",
            old_clean, new_app_name, key
        ))
    }
}

fn tag_regex(key: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r#"(?s)<string\s+name\s*=\s*"{}"\s*>(.*?)</string>"#,
        regex::escape(key)
    ))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updater_with(text: &str) -> (tempfile::TempDir, StringsUpdater) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strings.xml");
        fs::write(&path, text).unwrap();
        (dir, StringsUpdater::new(path))
    }

    #[test]
    fn test_update_existing_app_name() {
        let (_dir, mut updater) = updater_with(
            "<resources>\n    <string name=\"app_name\">Old Game</string>\n</resources>\n",
        );
        let message = updater.update_app_name("New Game").unwrap();

        assert!(message.contains("Updated app_name"));
        assert_eq!(updater.old_app_name(), Some("Old Game"));

        let text = fs::read_to_string(&updater.strings_path).unwrap();
        assert!(text.contains("<string name=\"app_name\">New Game</string>"));
    }

    #[test]
    fn test_alias_key_used_when_present() {
        let (_dir, mut updater) = updater_with(
            "<resources>\n    <string name=\"godot_project_name_string\">Old</string>\n</resources>\n",
        );
        let message = updater.update_app_name("New").unwrap();
        assert!(message.contains("godot_project_name_string"));
    }

    #[test]
    fn test_tag_added_when_missing() {
        let (_dir, mut updater) =
            updater_with("<resources>\n    <string name=\"other\">x</string>\n</resources>\n");
        let message = updater.update_app_name("Fresh Name").unwrap();
        assert!(message.contains("Added app_name tag"));

        let text = fs::read_to_string(&updater.strings_path).unwrap();
        assert!(text.contains("<string name=\"app_name\">Fresh Name</string>"));
        assert!(text.trim_end().ends_with("</resources>"));
    }

    #[test]
    fn test_already_set_is_a_no_op() {
        let (_dir, mut updater) = updater_with(
            "<resources>\n    <string name=\"app_name\">Same</string>\n</resources>\n",
        );
        let message = updater.update_app_name("Same").unwrap();
        assert!(message.contains("already set"));
    }
}
