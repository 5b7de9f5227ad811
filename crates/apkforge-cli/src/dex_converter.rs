//! JAR to DEX conversion through d8 (dx as fallback)

use crate::platform_utils::{find_executable, run_checked};
use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Finds and runs the SDK dexer
pub struct DexConverter {
    android_sdk: PathBuf,
}

impl DexConverter {
    pub fn new(android_sdk: PathBuf) -> Self {
        Self { android_sdk }
    }

    /// d8 from the newest build-tools, then dx, then PATH
    pub fn find_d8(&self) -> Result<PathBuf> {
        let build_tools_dir = self.android_sdk.join("build-tools");
        if build_tools_dir.exists() {
            let mut versions: Vec<PathBuf> = fs::read_dir(&build_tools_dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            versions.sort();
            versions.reverse();

            for version_dir in &versions {
                for name in tool_names() {
                    let candidate = version_dir.join(name);
                    if candidate.exists() {
                        return Ok(candidate);
                    }
                }
            }
        }

        find_executable("d8")
            .or_else(|| find_executable("dx"))
            .ok_or_else(|| anyhow!("d8/dx not found in build-tools or on PATH"))
    }

    /// Convert a combined JAR into one or more DEX files
    pub fn convert_to_dex(
        &self,
        combined_jar: &Path,
        android_jar: &Path,
        output_dir: &Path,
        min_api: u32,
    ) -> Result<Vec<PathBuf>> {
        let d8 = self.find_d8()?;

        run_checked(
            &d8,
            [
                combined_jar.as_os_str().to_os_string(),
                OsString::from("--lib"),
                android_jar.as_os_str().to_os_string(),
                OsString::from("--min-api"),
                OsString::from(min_api.to_string()),
                OsString::from("--output"),
                output_dir.as_os_str().to_os_string(),
            ],
            "D8 dex conversion",
        )?;

        let mut dex_files: Vec<PathBuf> = fs::read_dir(output_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "dex"))
            .collect();
        dex_files.sort();

        if dex_files.is_empty() {
            return Err(anyhow!("d8 produced no DEX files in {}", output_dir.display()));
        }

        Ok(dex_files)
    }
}

fn tool_names() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["d8.bat", "d8.cmd", "d8.exe", "d8", "dx.bat", "dx.cmd", "dx.exe", "dx"]
    } else {
        &["d8", "dx"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d8_found_in_newest_build_tools() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("build-tools/30.0.3");
        let new = dir.path().join("build-tools/34.0.0");
        fs::create_dir_all(&old).unwrap();
        fs::create_dir_all(&new).unwrap();
        fs::write(old.join("d8"), b"").unwrap();
        fs::write(new.join("d8"), b"").unwrap();

        let converter = DexConverter::new(dir.path().to_path_buf());
        let found = converter.find_d8().unwrap();
        assert!(found.starts_with(&new));
    }
}
