//! JAR creation and combination through the JDK `jar` tool

use crate::platform_utils::{find_executable, run_checked};
use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wraps the `jar` executable
pub struct JarBuilder;

impl JarBuilder {
    pub fn new() -> Self {
        Self
    }

    fn find_jar_tool(&self) -> Result<PathBuf> {
        if let Ok(java_home) = std::env::var("JAVA_HOME") {
            let candidate = Path::new(&java_home).join("bin").join(if cfg!(windows) {
                "jar.exe"
            } else {
                "jar"
            });
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        find_executable("jar").ok_or_else(|| anyhow!("jar tool not found (is a JDK installed?)"))
    }

    /// Package a classes directory into a JAR
    pub fn create_jar(&self, classes_dir: &Path, output_jar: &Path) -> Result<PathBuf> {
        let jar = self.find_jar_tool()?;

        run_checked(
            &jar,
            [
                OsString::from("cf"),
                output_jar.as_os_str().to_os_string(),
                OsString::from("-C"),
                classes_dir.as_os_str().to_os_string(),
                OsString::from("."),
            ],
            "jar creation",
        )?;

        if !output_jar.exists() {
            return Err(anyhow!("jar tool reported success but {} is missing", output_jar.display()));
        }

        Ok(output_jar.to_path_buf())
    }

    /// Merge the main JAR with library JARs by extracting everything
    /// into a scratch directory and repacking
    pub fn combine_jars(
        &self,
        main_jar: &Path,
        library_jars: &[PathBuf],
        output_jar: &Path,
        work_dir: &Path,
    ) -> Result<PathBuf> {
        let jar = self.find_jar_tool()?;
        let extract_dir = work_dir.join("jar_extract");
        if extract_dir.exists() {
            fs::remove_dir_all(&extract_dir)?;
        }
        fs::create_dir_all(&extract_dir)?;

        self.extract_into(&jar, main_jar, &extract_dir)?;
        for lib in library_jars {
            if lib.exists() {
                debug!(lib = %lib.display(), "extracting library jar");
                self.extract_into(&jar, lib, &extract_dir)?;
            }
        }

        run_checked_in(
            &jar,
            [
                OsString::from("cf"),
                output_jar.as_os_str().to_os_string(),
                OsString::from("."),
            ],
            &extract_dir,
            "jar combine",
        )?;

        fs::remove_dir_all(&extract_dir).ok();

        Ok(output_jar.to_path_buf())
    }

    fn extract_into(&self, jar_tool: &Path, jar_file: &Path, extract_dir: &Path) -> Result<()> {
        run_checked_in(
            jar_tool,
            [
                OsString::from("xf"),
                jar_file.as_os_str().to_os_string(),
            ],
            extract_dir,
            "jar extraction",
        )?;
        Ok(())
    }
}

impl Default for JarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `run_checked` with a working directory, for the extract/repack steps
fn run_checked_in<I, S>(
    program: &Path,
    args: I,
    cwd: &Path,
    step_name: &str,
) -> Result<crate::platform_utils::CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    use anyhow::{bail, Context};

    let output = std::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("failed to run {}", program.display()))?;

    let result = crate::platform_utils::CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.success() {
        bail!(
            "{} failed: {}",
            step_name,
            crate::platform_utils::truncate_error(result.error_output())
        );
    }

    Ok(result)
}
