//! Zipalign and apksigner wrappers

use crate::platform_utils::{find_tool_in, run_checked};
use anyhow::{anyhow, bail, Result};
use apkforge_core::KeystoreConfig;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locates and drives the SDK signing tools
pub struct ApkSigner {
    android_sdk: PathBuf,
}

impl ApkSigner {
    pub fn new(android_sdk: PathBuf) -> Self {
        Self { android_sdk }
    }

    /// Newest installed build-tools directory
    pub fn find_build_tools(&self) -> Result<PathBuf> {
        let build_tools_dir = self.android_sdk.join("build-tools");
        if !build_tools_dir.exists() {
            bail!("Android build-tools directory not found");
        }

        let mut versions: Vec<PathBuf> = fs::read_dir(&build_tools_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && version_key(path) != (0, 0, 0))
            .collect();

        if versions.is_empty() {
            bail!("No build-tools versions found");
        }

        versions.sort_by_key(|path| std::cmp::Reverse(version_key(path)));
        let latest = versions.remove(0);
        debug!(build_tools = %latest.display(), "selected build-tools");
        Ok(latest)
    }

    /// Locate zipalign and apksigner inside a build-tools directory,
    /// falling back to PATH
    pub fn locate_tools(&self, build_tools: &Path) -> Result<(PathBuf, PathBuf)> {
        let zipalign = find_tool_in(
            build_tools,
            "zipalign",
            &["zipalign.exe", "zipalign.bat"],
        )
        .ok_or_else(|| anyhow!("zipalign not found"))?;

        let apksigner = find_tool_in(
            build_tools,
            "apksigner",
            &["apksigner.jar", "apksigner.bat", "apksigner.sh"],
        )
        .ok_or_else(|| anyhow!("apksigner not found"))?;

        Ok((zipalign, apksigner))
    }

    pub fn zipalign(&self, zipalign: &Path, input_apk: &Path, output_apk: &Path) -> Result<()> {
        run_checked(
            zipalign,
            [
                OsString::from("-f"),
                OsString::from("-p"),
                OsString::from("4"),
                input_apk.to_path_buf().into(),
                output_apk.to_path_buf().into(),
            ],
            "zipalign",
        )?;
        Ok(())
    }

    pub fn sign(
        &self,
        apksigner: &Path,
        input_apk: &Path,
        output_apk: &Path,
        keystore: &KeystoreConfig,
    ) -> Result<()> {
        let (program, mut args) = signer_invocation(apksigner);
        args.extend([
            OsString::from("sign"),
            OsString::from("--ks"),
            keystore.path.clone().into(),
            OsString::from("--ks-key-alias"),
            keystore.alias.clone().into(),
            OsString::from("--ks-pass"),
            format!("pass:{}", keystore.password).into(),
            OsString::from("--key-pass"),
            format!("pass:{}", keystore.key_password).into(),
            OsString::from("--v1-signing-enabled"),
            OsString::from("true"),
            OsString::from("--v2-signing-enabled"),
            OsString::from("true"),
            OsString::from("--v3-signing-enabled"),
            OsString::from("true"),
            OsString::from("--v4-signing-enabled"),
            OsString::from("true"),
            OsString::from("--out"),
            output_apk.to_path_buf().into(),
            input_apk.to_path_buf().into(),
        ]);

        run_checked(program, args, "APK signing")?;
        Ok(())
    }

    pub fn verify(&self, apksigner: &Path, signed_apk: &Path) -> Result<()> {
        let (program, mut args) = signer_invocation(apksigner);
        args.extend([
            OsString::from("verify"),
            OsString::from("--verbose"),
            OsString::from("--print-certs"),
            signed_apk.to_path_buf().into(),
        ]);

        run_checked(program, args, "APK verification")?;
        Ok(())
    }
}

/// apksigner ships either as an executable or as a bare jar
fn signer_invocation(apksigner: &Path) -> (OsString, Vec<OsString>) {
    if apksigner.extension().is_some_and(|ext| ext == "jar") {
        (
            OsString::from("java"),
            vec![OsString::from("-jar"), apksigner.to_path_buf().into()],
        )
    } else {
        (apksigner.as_os_str().to_os_string(), Vec::new())
    }
}

fn version_key(path: &Path) -> (u32, u32, u32) {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let mut parts = name.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_build_tools_selected() {
        let dir = tempfile::tempdir().unwrap();
        let build_tools = dir.path().join("build-tools");
        for version in ["30.0.3", "34.0.0", "33.0.1", "notes"] {
            fs::create_dir_all(build_tools.join(version)).unwrap();
        }

        let signer = ApkSigner::new(dir.path().to_path_buf());
        let latest = signer.find_build_tools().unwrap();
        assert_eq!(latest.file_name().unwrap(), "34.0.0");
    }

    #[test]
    fn test_missing_build_tools_errors() {
        let dir = tempfile::tempdir().unwrap();
        let signer = ApkSigner::new(dir.path().to_path_buf());
        assert!(signer.find_build_tools().is_err());
    }

    #[test]
    fn test_jar_signer_runs_through_java() {
        let (program, args) = signer_invocation(Path::new("/bt/apksigner.jar"));
        assert_eq!(program, "java");
        assert_eq!(args[0], "-jar");

        let (program, args) = signer_invocation(Path::new("/bt/apksigner"));
        assert_eq!(program, "/bt/apksigner");
        assert!(args.is_empty());
    }
}
