//! Apktool decompilation wrapper

use crate::platform_utils::{run_command, truncate_error};
use anyhow::{bail, Result};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

const LAST_LINES_TO_SHOW: usize = 3;

/// Runs `apktool d` and prepares the output directory
pub struct Decompiler {
    apktool_jar: PathBuf,
    source_apk: PathBuf,
    output_dir: PathBuf,
}

impl Decompiler {
    pub fn new(apktool_jar: PathBuf, source_apk: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            apktool_jar,
            source_apk,
            output_dir,
        }
    }

    pub fn decompile(&self) -> Result<()> {
        println!("  Running apktool...");

        if self.output_dir.exists() {
            let _ = fs::remove_dir_all(&self.output_dir);
        }

        let args = self.command_args();
        println!(
            "  Command: java {}",
            args.iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = run_command("java", &args)?;
        if !output.success() {
            bail!(
                "Apktool failed with code {}:\n{}",
                output.code.map_or("?".to_string(), |c| c.to_string()),
                truncate_error(output.error_output())
            );
        }

        for line in last_lines(&output.stdout, LAST_LINES_TO_SHOW) {
            if !line.trim().is_empty() {
                println!("    {}", line.trim());
            }
        }

        Ok(())
    }

    fn command_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-jar"),
            self.apktool_jar.clone().into(),
            OsString::from("d"),
            OsString::from("-f"),
            self.source_apk.clone().into(),
            OsString::from("-o"),
            self.output_dir.clone().into(),
        ]
    }
}

fn last_lines(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.trim().lines().collect();
    let skip = lines.len().saturating_sub(count);
    lines[skip..].to_vec()
}
