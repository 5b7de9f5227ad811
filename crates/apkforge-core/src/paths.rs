//! Resolution of every file path used during a build

use crate::config::PathsSection;
use std::path::{Path, PathBuf};

/// All resolved paths for one build, produced once at startup
#[derive(Debug, Clone)]
pub struct PathTable {
    pub project_root: PathBuf,
    /// Directory holding the source APK
    pub original_dir: PathBuf,
    /// Decompiled working tree
    pub modded_dir: PathBuf,
    /// Custom Java/Kotlin/smali sources
    pub src_dir: PathBuf,
    pub libs_dir: Option<PathBuf>,
    pub android_sdk: Option<PathBuf>,
    pub apktool_jar: Option<PathBuf>,
    pub baksmali_jar: Option<PathBuf>,
    pub smali_jar: Option<PathBuf>,
}

impl PathTable {
    /// Resolve the path table from the `paths` configuration section.
    ///
    /// Relative entries resolve against the project root; `${VAR}` and
    /// leading `~` are expanded first. The Android SDK falls back to
    /// auto-detection when not configured.
    pub fn resolve(project_root: &Path, paths: &PathsSection) -> Self {
        let root = project_root.to_path_buf();
        let dirs = &paths.directories;

        let android_sdk = paths
            .tools
            .android_sdk
            .as_deref()
            .map(|raw| resolve_one(&root, raw))
            .or_else(detect_android_sdk);

        Self {
            original_dir: resolve_one(&root, &dirs.original),
            modded_dir: resolve_one(&root, &dirs.modded),
            src_dir: resolve_one(&root, &dirs.src),
            libs_dir: paths.libs.as_deref().map(|raw| resolve_one(&root, raw)),
            android_sdk,
            apktool_jar: paths.tools.apktool.as_deref().map(|raw| resolve_one(&root, raw)),
            baksmali_jar: paths.tools.baksmali.as_deref().map(|raw| resolve_one(&root, raw)),
            smali_jar: paths.tools.smali.as_deref().map(|raw| resolve_one(&root, raw)),
            project_root: root,
        }
    }
}

fn resolve_one(project_root: &Path, raw: &str) -> PathBuf {
    let expanded = expand_env_vars(raw);

    if let Some(rest) = expanded.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
    }

    let path = PathBuf::from(&expanded);
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

/// Expand `${VAR}` references from the environment, leaving unknown
/// variables untouched
fn expand_env_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find('}') {
            Some(end) => {
                let name = &rest[start + 2..start + 2 + end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&rest[start..start + 3 + end]),
                }
                rest = &rest[start + 3 + end..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Find the Android SDK: environment variables first, then the
/// well-known install locations for the current platform, then
/// `sdkmanager` on PATH.
pub fn detect_android_sdk() -> Option<PathBuf> {
    for var in ["ANDROID_SDK_ROOT", "ANDROID_HOME", "ANDROID_SDK"] {
        if let Ok(value) = std::env::var(var) {
            let path = PathBuf::from(value);
            if path.exists() {
                return Some(path);
            }
        }
    }

    candidate_sdk_paths().into_iter().find(|p| p.exists())
}

fn candidate_sdk_paths() -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_default();

    if cfg!(target_os = "windows") {
        vec![
            home.join("AppData/Local/Android/Sdk"),
            PathBuf::from("C:/Android/sdk"),
            PathBuf::from("C:/android-sdk"),
            home.join("Android/Sdk"),
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            home.join("Library/Android/sdk"),
            PathBuf::from("/usr/local/share/android-sdk"),
            PathBuf::from("/opt/android-sdk"),
            home.join("Android/sdk"),
        ]
    } else {
        vec![
            home.join("Android/Sdk"),
            home.join("android-sdk"),
            PathBuf::from("/usr/lib/android-sdk"),
            PathBuf::from("/usr/local/lib/android-sdk"),
            PathBuf::from("/opt/android-sdk"),
            home.join(".local/share/android-sdk"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsSection;

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let paths = PathsSection::default();
        let table = PathTable::resolve(Path::new("/work/project"), &paths);
        assert_eq!(table.modded_dir, PathBuf::from("/work/project/ModdedGame"));
        assert_eq!(table.original_dir, PathBuf::from("/work/project/OriginalGame"));
        assert!(table.apktool_jar.is_none());
    }

    #[test]
    fn test_absolute_path_kept() {
        let mut paths = PathsSection::default();
        paths.tools.apktool = Some("/opt/tools/apktool.jar".to_string());
        let table = PathTable::resolve(Path::new("/work/project"), &paths);
        assert_eq!(
            table.apktool_jar,
            Some(PathBuf::from("/opt/tools/apktool.jar"))
        );
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("APKFORGE_TEST_TOOLS", "/srv/tools");
        assert_eq!(
            expand_env_vars("${APKFORGE_TEST_TOOLS}/apktool.jar"),
            "/srv/tools/apktool.jar"
        );
        // unknown variables survive untouched
        assert_eq!(
            expand_env_vars("${APKFORGE_TEST_MISSING}/x"),
            "${APKFORGE_TEST_MISSING}/x"
        );
    }
}
