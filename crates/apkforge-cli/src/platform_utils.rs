//! Process spawning and platform helpers shared by the tool wrappers

use anyhow::{bail, Context, Result};
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const MAX_ERROR_OUTPUT_LENGTH: usize = 500;

/// Captured output of one finished external command
#[derive(Debug)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stderr, falling back to stdout, for error reporting
    pub fn error_output(&self) -> &str {
        if !self.stderr.trim().is_empty() {
            &self.stderr
        } else if !self.stdout.trim().is_empty() {
            &self.stdout
        } else {
            "No error output"
        }
    }
}

/// Run an external command, capturing stdout/stderr as lossy UTF-8
pub fn run_command<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref().to_os_string();
    let mut cmd = Command::new(&program);
    cmd.args(args);
    debug!(?cmd, "running external command");

    let output = cmd
        .output()
        .with_context(|| format!("failed to run {}", program.to_string_lossy()))?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command and fail with a truncated error message on a non-zero
/// exit
pub fn run_checked<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    step_name: &str,
) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_command(program, args)?;
    if !output.success() {
        bail!(
            "{} failed with code {}: {}",
            step_name,
            output.code.map_or("?".to_string(), |c| c.to_string()),
            truncate_error(output.error_output())
        );
    }
    Ok(output)
}

/// Keep tool errors readable on the console
pub fn truncate_error(text: &str) -> String {
    if text.len() > MAX_ERROR_OUTPUT_LENGTH {
        let mut cut = MAX_ERROR_OUTPUT_LENGTH;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}

/// Extensions an executable may carry on the current platform
fn platform_extensions() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["", ".exe", ".bat", ".cmd"]
    } else {
        &["", ".sh"]
    }
}

/// Locate an executable on PATH, trying platform-specific extensions
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        for ext in platform_extensions() {
            let candidate = dir.join(format!("{}{}", name, ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Look for a tool inside a directory, trying alternative file names
/// first, then PATH
pub fn find_tool_in(dir: &Path, name: &str, alternatives: &[&str]) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.exists() {
        return Some(direct);
    }
    for alt in alternatives {
        let candidate = dir.join(alt);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    find_executable(name)
}

/// One-line platform banner, also exposed as the pipeline step
/// `platform_utils.print_platform_info`
pub fn platform_summary() -> String {
    format!("{} ({})", env::consts::OS, env::consts::ARCH)
}

pub fn print_platform_info() {
    println!("\nPlatform: {}", platform_summary());
    if let Ok(cwd) = env::current_dir() {
        println!("Working directory: {}", cwd.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_error_short_text_untouched() {
        assert_eq!(truncate_error("brief"), "brief");
    }

    #[test]
    fn test_truncate_error_long_text() {
        let long = "x".repeat(600);
        let truncated = truncate_error(&long);
        assert_eq!(truncated.len(), 503);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_error_output_preference() {
        let both = CommandOutput {
            code: Some(1),
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(both.error_output(), "err");

        let stdout_only = CommandOutput {
            code: Some(1),
            stdout: "out".to_string(),
            stderr: String::new(),
        };
        assert_eq!(stdout_only.error_output(), "out");

        let silent = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(silent.error_output(), "No error output");
    }

    #[test]
    fn test_find_tool_in_prefers_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("zipalign.exe");
        std::fs::write(&tool, b"").unwrap();

        let found = find_tool_in(dir.path(), "zipalign", &["zipalign.exe", "zipalign.bat"]);
        assert_eq!(found, Some(tool));
    }
}
