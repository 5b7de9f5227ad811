//! ApkForge entry point: load configuration, wire the pipeline engine,
//! run the configured steps.

use anyhow::{Context, Result};
use apkforge_cli::{build_injector, build_registry, BuildTool};
use apkforge_core::{PathTable, ProjectConfig};
use apkforge_runtime::PipelineRunner;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    println!("============================================================");
    println!("   BUILD TOOL STARTED: {}", Local::now().format("%c"));
    println!("============================================================");

    let project_root = find_project_root()?;

    println!("\nLoading project configuration...");
    let mut config = ProjectConfig::load(&project_root)
        .context("could not load build configuration")?;
    let overridden = config.update_from_env();
    for field in overridden {
        println!("  Set {} from environment", field);
    }
    print_config_summary(&config);

    let paths = PathTable::resolve(&project_root, &config.paths);
    info!(project_root = %project_root.display(), "resolved path table");

    if config.pipeline.is_empty() {
        println!("\n[WARNING] No pipeline defined in build_config.json");
        println!("    Add 'pipeline' section with list of methods to execute:");
        println!(
            r#"
    "pipeline": [
        "load_keystore_config",
        "find_tools",
        "run_apktool_decompile",
        "build_signed_apk",
        "print_final_summary"
    ]
"#
        );
        return Ok(());
    }

    let config = Arc::new(config);
    let mut tool = BuildTool::new(paths, Arc::clone(&config));
    let mut runner = PipelineRunner::new(
        build_registry(),
        build_injector(),
        config.pipeline_behavior.clone(),
    );

    if config.debug_pipeline {
        println!("\nAvailable pipeline steps:");
        for step in runner.list_available_steps() {
            println!("  - {}", step);
        }
    }

    let success = runner.run(&mut tool, &config.pipeline);

    if config.save_pipeline_report {
        let report_path = project_root.join("pipeline_report.json");
        runner.save_report(&report_path)?;
    }

    if !success {
        println!("\n[WARNING] Pipeline completed with errors");
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apkforge_cli=info,apkforge_runtime=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Walk up from the working directory to the first build_config.json
fn find_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let mut current = cwd.as_path();
    loop {
        if current.join("build_config.json").exists() {
            return Ok(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Ok(cwd),
        }
    }
}

fn print_config_summary(config: &ProjectConfig) {
    println!(
        "    Version: {} (code: {})",
        config.version.name, config.version.code
    );
    println!("    App: {} ({})", config.app.name, config.app.package_id);
    println!(
        "    Build: {}, target DEX: {}",
        config.build.build_type, config.build.target_dex_index
    );
    if !config.abi.keep_only.is_empty() {
        println!("    Keeping ABIs: {}", config.abi.keep_only.join(", "));
    }
    if !config.paths.additional_smali_dirs.is_empty() {
        println!(
            "    Additional smali dirs: {}",
            config.paths.additional_smali_dirs.len()
        );
    }
}
