//! Registry and injector wiring
//!
//! Built once at startup: every step name the pipeline may reference is
//! registered here, and the injector maps the recognized constructor
//! parameter names to values pulled from the live build tool.

use crate::abi_filter::AbiFilter;
use crate::build_tool::BuildTool;
use crate::decompiler::Decompiler;
use crate::file_cleaner::FileCleaner;
use crate::platform_utils;
use crate::yaml_updater::YamlUpdater;
use apkforge_runtime::{Dep, HelperSpec, Injector, Registry, StepError};
use std::path::PathBuf;

/// Every host method, free function and helper class the pipeline can
/// name
pub fn build_registry() -> Registry<BuildTool> {
    let mut reg = Registry::new();

    // configuration and discovery
    reg.host_method("load_keystore_config", BuildTool::load_keystore_config);
    reg.host_method("find_tools", BuildTool::find_tools);

    // decompilation
    reg.host_method("prepare_decompile_directory", BuildTool::prepare_decompile_directory);
    reg.host_method("run_apktool_decompile", BuildTool::run_apktool_decompile);
    reg.host_method("verify_decompile_success", BuildTool::verify_decompile_success);
    reg.host_method("count_decompiled_files", BuildTool::count_decompiled_files);

    // patching
    reg.host_method("update_apktool_yml", BuildTool::update_apktool_yml);
    reg.host_method("update_build_config", BuildTool::update_build_config);
    reg.host_method("update_strings", BuildTool::update_strings);
    reg.host_method("update_manifest", BuildTool::update_manifest);
    reg.host_method("merge_resources", BuildTool::merge_resources);
    reg.host_method("filter_abis", BuildTool::filter_abis);

    // compilation
    reg.host_method("prepare_compilation_directories", BuildTool::prepare_compilation_directories);
    reg.host_method("find_android_jar", BuildTool::find_android_jar);
    reg.host_method("find_source_files", BuildTool::find_source_files);
    reg.host_method("find_library_jars", BuildTool::find_library_jars);
    reg.host_method("prepare_classpath", BuildTool::prepare_classpath);
    reg.host_method("compile_java_files", BuildTool::compile_java_files);
    reg.host_method("compile_kotlin_files", BuildTool::compile_kotlin_files);
    reg.host_method("verify_compilation", BuildTool::verify_compilation);
    reg.host_method("create_jar_from_classes", BuildTool::create_jar_from_classes);
    reg.host_method("combine_jars", BuildTool::combine_jars);
    reg.host_method("convert_jar_to_dex", BuildTool::convert_jar_to_dex);
    reg.host_method("decompile_dex_to_smali", BuildTool::decompile_dex_to_smali);
    reg.host_method("merge_custom_smali", BuildTool::merge_custom_smali);

    // assembly and signing
    reg.host_method("build_unsigned_apk", BuildTool::build_unsigned_apk);
    reg.host_method("zipalign_apk", BuildTool::zipalign_apk);
    reg.host_method("sign_apk", BuildTool::sign_apk);
    reg.host_method("verify_signature", BuildTool::verify_signature);
    reg.host_method("build_signed_apk", BuildTool::build_signed_apk);
    reg.host_method("cleanup_temp_files", BuildTool::cleanup_temp_files);
    reg.host_method("cleanup_all", BuildTool::cleanup_all);

    // reporting
    reg.host_method("show_apk_info", BuildTool::show_apk_info);
    reg.host_method("list_apks", BuildTool::list_apks);
    reg.host_method("print_changed_values", BuildTool::print_changed_values);
    reg.host_method("print_final_summary", BuildTool::print_final_summary);

    // free functions
    reg.function("platform_utils.print_platform_info", |_args| {
        platform_utils::print_platform_info();
        Ok(())
    });

    // helper classes, auto-constructed from injected dependencies
    reg.helper(
        "decompiler.Decompiler",
        HelperSpec::new(
            &["apktool_jar", "source_apk", "modded_dir"],
            |deps| {
                Ok(Decompiler::new(
                    deps.path("apktool_jar")?,
                    deps.path("source_apk")?,
                    deps.path("modded_dir")?,
                ))
            },
        )
        .method("decompile", |decompiler: &mut Decompiler, _args, _diag| {
            decompiler.decompile().map_err(StepError::from)
        }),
    );

    reg.helper(
        "yaml_updater.YamlUpdater",
        HelperSpec::new(&["modded_dir", "config"], |deps| {
            let modded_dir = deps.path("modded_dir")?;
            let config = deps.config("config")?;
            Ok((YamlUpdater::new(modded_dir.join("apktool.yml")), config))
        })
        .method(
            "update",
            |state: &mut (YamlUpdater, std::sync::Arc<apkforge_core::ProjectConfig>),
             _args,
             _diag| {
                let (updater, config) = state;
                updater.load()?;
                let (_, updated) =
                    updater.update(config.version.code, &config.version.name, &config.app.name)?;
                if !updated {
                    println!("[INFO] No changes needed in apktool.yml");
                }
                Ok(())
            },
        ),
    );

    reg.helper(
        "abi_filter.AbiFilter",
        HelperSpec::new(&["modded_dir", "config", "logger"], |deps| {
            let modded_dir = deps.path("modded_dir")?;
            let config = deps.config("config")?;
            Ok(AbiFilter::new(&modded_dir, &config.abi))
        })
        .method("filter", |filter: &mut AbiFilter, _args, diagnostics| {
            filter.filter(diagnostics)?;
            Ok(())
        }),
    );

    reg.helper(
        "file_cleaner.FileCleaner",
        HelperSpec::new(&[], |_deps| Ok(FileCleaner::new())).method(
            "cleanup_by_pattern",
            |cleaner: &mut FileCleaner, args, _diag| {
                let directory = args
                    .get_path(0)
                    .map_err(StepError::from)?
                    .ok_or_else(|| StepError::execution("cleanup_by_pattern needs a directory"))?;
                let pattern = args
                    .get_str(1)
                    .map_err(StepError::from)?
                    .unwrap_or("*")
                    .to_string();
                cleaner.cleanup_by_pattern(&directory, &pattern);
                Ok(())
            },
        ),
    );

    reg
}

/// Recognized constructor parameter names and where their values come
/// from. Anything outside this table is a hard construction error.
pub fn build_injector() -> Injector<BuildTool> {
    Injector::new()
        .provider("modded_dir", |tool: &BuildTool| {
            Dep::Path(tool.paths.modded_dir.clone())
        })
        .provider("android_sdk", |tool: &BuildTool| {
            opt_path(tool.paths.android_sdk.clone())
        })
        .provider("paths", |tool: &BuildTool| Dep::Paths(tool.paths.clone()))
        .provider("config", |tool: &BuildTool| {
            Dep::Config(tool.config.clone())
        })
        .provider("logger", |_tool| Dep::Null)
        .provider("apktool_jar", |tool: &BuildTool| {
            opt_path(tool.tools.as_ref().map(|t| t.apktool_jar.clone()))
        })
        .provider("baksmali_jar", |tool: &BuildTool| {
            opt_path(tool.tools.as_ref().and_then(|t| t.baksmali_jar.clone()))
        })
        .provider("source_apk", |tool: &BuildTool| {
            opt_path(tool.tools.as_ref().map(|t| t.source_apk.clone()))
        })
}

fn opt_path(path: Option<PathBuf>) -> Dep {
    match path {
        Some(path) => Dep::Path(path),
        None => Dep::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge_core::config::PathsSection;
    use apkforge_core::{PathTable, ProjectConfig};
    use std::sync::Arc;

    fn test_tool() -> BuildTool {
        let config: ProjectConfig = serde_json::from_str(
            r#"{
                "version": {"code": 1, "name": "1.0"},
                "app": {"name": "A", "package_id": "a.b"},
                "build": {"type": "debug"}
            }"#,
        )
        .unwrap();
        let paths = PathTable::resolve(std::path::Path::new("/tmp/project"), &PathsSection::default());
        BuildTool::new(paths, Arc::new(config))
    }

    #[test]
    fn test_registry_covers_the_build_phases() {
        let reg = build_registry();
        let names = reg.host_names();

        for expected in [
            "find_tools",
            "run_apktool_decompile",
            "update_apktool_yml",
            "build_unsigned_apk",
            "sign_apk",
            "build_signed_apk",
            "print_final_summary",
        ] {
            assert!(names.contains(&expected), "missing step {expected}");
        }
    }

    #[test]
    fn test_injector_provides_recognized_parameters() {
        let tool = test_tool();
        let injector = build_injector();

        let deps = injector
            .resolve("x.Y", &["modded_dir", "config", "logger"], &tool)
            .unwrap();
        assert!(deps.path("modded_dir").unwrap().ends_with("ModdedGame"));
        assert_eq!(deps.config("config").unwrap().app.package_id, "a.b");
    }

    #[test]
    fn test_unconfigured_tool_jar_resolves_to_null() {
        let tool = test_tool();
        let injector = build_injector();

        let deps = injector.resolve("x.Y", &["baksmali_jar"], &tool).unwrap();
        assert_eq!(deps.opt_path("baksmali_jar").unwrap(), None);
    }
}
