//! The build tool host: owns all build state and exposes every
//! build-phase operation the pipeline can invoke

use crate::abi_filter::AbiFilter;
use crate::apk_builder::ApkBuilder;
use crate::apk_signer::ApkSigner;
use crate::decompiler::Decompiler;
use crate::dex_converter::DexConverter;
use crate::file_cleaner::FileCleaner;
use crate::file_finder::{FileFinder, FoundTools};
use crate::jar_builder::JarBuilder;
use crate::java_compiler::{count_class_files, JavaCompiler};
use crate::kotlin_compiler::KotlinCompiler;
use crate::manifest_updater::{ManifestManager, ManifestUpdater};
use crate::resource_manager::ResourceManager;
use crate::smali_decompiler::{smali_dir_name, SmaliDecompiler};
use crate::smali_updater::SmaliUpdater;
use crate::strings_updater::StringsUpdater;
use crate::yaml_updater::YamlUpdater;
use apkforge_core::{CallArgs, Diagnostics, KeystoreConfig, PathTable, ProjectConfig};
use apkforge_runtime::{Host, StepError};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub type StepResult = Result<(), StepError>;

const UNSIGNED_APK: &str = "unsigned.apk";
const ALIGNED_APK: &str = "aligned.apk";

/// One recorded configuration change, shown in the final summary
#[derive(Debug, Clone)]
pub struct ChangedValue {
    pub name: String,
    pub old: String,
    pub new: String,
}

/// Temp locations used by the compilation phase
#[derive(Debug, Clone)]
struct TempDirs {
    classes: PathBuf,
    jar: PathBuf,
    dex: PathBuf,
    combined: PathBuf,
    src: PathBuf,
}

impl TempDirs {
    fn under(modded_dir: &Path) -> Self {
        Self {
            classes: modded_dir.join("temp_classes"),
            jar: modded_dir.join("temp.jar"),
            dex: modded_dir.join("temp_dex"),
            combined: modded_dir.join("temp_combined.jar"),
            src: modded_dir.join("temp_src"),
        }
    }
}

/// The orchestrating application instance the pipeline runs against
pub struct BuildTool {
    pub paths: PathTable,
    pub config: Arc<ProjectConfig>,
    pub tools: Option<FoundTools>,
    pub keystore: Option<KeystoreConfig>,

    diagnostics: Diagnostics,
    changed_values: Vec<ChangedValue>,

    temp_dirs: Option<TempDirs>,
    android_jar: Option<PathBuf>,
    java_files: Vec<PathBuf>,
    kotlin_files: Vec<PathBuf>,
    library_jars: Vec<PathBuf>,
    classpath: Option<String>,
    temp_jar: Option<PathBuf>,
    combined_jar: Option<PathBuf>,
    dex_files: Vec<PathBuf>,

    unsigned_apk_path: Option<PathBuf>,
    aligned_apk_path: Option<PathBuf>,
    signed_apk_path: Option<PathBuf>,
}

impl Host for BuildTool {
    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }
}

impl BuildTool {
    pub fn new(paths: PathTable, config: Arc<ProjectConfig>) -> Self {
        Self {
            paths,
            config,
            tools: None,
            keystore: None,
            diagnostics: Diagnostics::new(),
            changed_values: Vec::new(),
            temp_dirs: None,
            android_jar: None,
            java_files: Vec::new(),
            kotlin_files: Vec::new(),
            library_jars: Vec::new(),
            classpath: None,
            temp_jar: None,
            combined_jar: None,
            dex_files: Vec::new(),
            unsigned_apk_path: None,
            aligned_apk_path: None,
            signed_apk_path: None,
        }
    }

    fn record_change(&mut self, name: impl Into<String>, old: impl Into<String>, new: impl Into<String>) {
        self.changed_values.push(ChangedValue {
            name: name.into(),
            old: old.into(),
            new: new.into(),
        });
    }

    fn tools(&self) -> Result<&FoundTools, StepError> {
        self.tools
            .as_ref()
            .ok_or_else(|| StepError::execution("tools not located. Run find_tools first"))
    }

    fn android_sdk(&self) -> Result<&Path, StepError> {
        self.paths
            .android_sdk
            .as_deref()
            .ok_or_else(|| StepError::execution("Android SDK not found. Configure paths.tools.android_sdk"))
    }

    // ------------------------------------------------------------------
    // configuration and discovery steps
    // ------------------------------------------------------------------

    pub fn load_keystore_config(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nLoading keystore configuration...");
        let keystore_path = self.config.keystore_config_path(&self.paths.project_root);
        println!("  Keystore config: {}", keystore_path.display());

        let mut keystore = KeystoreConfig::load(&keystore_path)?;
        keystore.validate(&self.paths.project_root)?;

        println!("[OK] Keystore: {}", keystore.path.display());
        println!("[OK] Keystore alias: {}", keystore.alias);
        self.keystore = Some(keystore);
        Ok(())
    }

    pub fn find_tools(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nFinding required files...");
        let found = FileFinder::new(&self.paths).find_all()?;

        println!("  Apktool: {}", found.apktool_jar.display());
        println!("  Source APK: {}", found.source_apk.display());
        self.tools = Some(found);
        println!("[OK] All required files found");
        Ok(())
    }

    // ------------------------------------------------------------------
    // decompilation steps
    // ------------------------------------------------------------------

    pub fn prepare_decompile_directory(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nPreparing decompile directory...");
        if self.paths.modded_dir.exists() {
            println!("  Removing existing directory: {}", self.paths.modded_dir.display());
            let _ = fs::remove_dir_all(&self.paths.modded_dir);
        }
        println!("  [OK] Directory ready: {}", self.paths.modded_dir.display());
        Ok(())
    }

    pub fn run_apktool_decompile(&mut self, _args: &CallArgs) -> StepResult {
        let tools = self.tools()?;
        println!("\nRunning apktool decompile...");
        println!("  Source: {}", tools.source_apk.display());
        println!("  Output: {}", self.paths.modded_dir.display());

        Decompiler::new(
            tools.apktool_jar.clone(),
            tools.source_apk.clone(),
            self.paths.modded_dir.clone(),
        )
        .decompile()?;

        println!("  [OK] Apktool decompile completed");
        Ok(())
    }

    pub fn verify_decompile_success(&mut self, _args: &CallArgs) -> StepResult {
        let missing: Vec<&str> = ["res", "smali"]
            .into_iter()
            .filter(|dir| !self.paths.modded_dir.join(dir).exists())
            .collect();

        if !missing.is_empty() {
            return Err(StepError::execution(format!(
                "decompile failed: missing directories {:?}",
                missing
            )));
        }

        println!("  [OK] Decompile verification passed");
        Ok(())
    }

    pub fn count_decompiled_files(&mut self, _args: &CallArgs) -> StepResult {
        let count = WalkDir::new(&self.paths.modded_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        println!("  [OK] Extracted {} files", count);
        Ok(())
    }

    // ------------------------------------------------------------------
    // patching steps
    // ------------------------------------------------------------------

    pub fn update_apktool_yml(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nUpdating apktool.yml...");
        let yml_path = self.paths.modded_dir.join("apktool.yml");
        println!("  Path: {}", yml_path.display());

        let mut updater = YamlUpdater::new(yml_path);
        updater.load()?;

        let old = updater.extract_values();
        println!("  Old versionCode: {}", old.version_code.as_deref().unwrap_or("?"));
        println!("  Old versionName: {}", old.version_name.as_deref().unwrap_or("?"));

        let (new_apk_name, updated) = updater.update(
            self.config.version.code,
            &self.config.version.name,
            &self.config.app.name,
        )?;

        if updated {
            println!("  New versionCode: {}", self.config.version.code);
            println!("  New versionName: {}", self.config.version.name);
            println!("[OK] apktool.yml updated");
            self.record_change(
                "apktool.yml versionCode",
                old.version_code.unwrap_or_default(),
                self.config.version.code.to_string(),
            );
            self.record_change(
                "apktool.yml versionName",
                old.version_name.unwrap_or_default(),
                self.config.version.name.clone(),
            );
            self.record_change(
                "apktool.yml apkFileName",
                old.apk_file_name.unwrap_or_default(),
                new_apk_name,
            );
        } else {
            println!("[INFO] No changes needed in apktool.yml");
        }
        Ok(())
    }

    pub fn update_build_config(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nUpdating BuildConfig.smali...");

        let smali_path = match self.find_build_config_smali() {
            Some(path) => path,
            None => {
                println!("  [WARNING] BuildConfig.smali not found, skipping");
                return Ok(());
            }
        };
        println!("  Path: {}", smali_path.display());

        let mut updater = SmaliUpdater::new(smali_path);
        updater.load()?;
        let old = updater.old_values().clone();

        let changes = updater.update_build_config(
            self.config.version.code,
            &self.config.version.name,
            &self.config.app.package_id,
            &self.config.build.build_type,
        )?;

        if changes.is_empty() {
            println!("  [INFO] No changes made to BuildConfig.smali");
        } else {
            println!("[OK] BuildConfig.smali updated ({} changes)", changes.len());
            for (field, value) in changes {
                let old_value = old.get(field).cloned().unwrap_or_else(|| "?".to_string());
                self.record_change(format!("BuildConfig.smali {}", field), old_value, value);
            }
        }
        Ok(())
    }

    fn find_build_config_smali(&self) -> Option<PathBuf> {
        WalkDir::new(&self.paths.modded_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name() == "BuildConfig.smali")
            .map(|e| e.into_path())
    }

    pub fn update_strings(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nUpdating strings.xml...");

        let strings_path = WalkDir::new(self.paths.modded_dir.join("res"))
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name() == "strings.xml")
            .map(|e| e.into_path());

        let strings_path = match strings_path {
            Some(path) => path,
            None => {
                println!("  [WARNING] strings.xml not found, skipping");
                return Ok(());
            }
        };
        println!("  Path: {}", strings_path.display());

        let mut updater = StringsUpdater::new(strings_path);
        let message = updater.update_app_name(&self.config.app.name)?;
        println!("  [OK] {}", message);

        let old = updater.old_app_name().unwrap_or("?").to_string();
        let new = self.config.app.name.clone();
        self.record_change("strings.xml app_name", old, new);
        Ok(())
    }

    pub fn update_manifest(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nUpdating AndroidManifest.xml...");
        let manifest_path = self.paths.modded_dir.join("AndroidManifest.xml");
        let custom_manifest = self.paths.src_dir.join("main").join("AndroidManifest.xml");

        println!("  Main manifest: {}", manifest_path.display());
        println!("  Custom manifest: {}", custom_manifest.display());

        let old_package = ManifestManager::new(manifest_path.clone())
            .package_name()
            .unwrap_or_else(|| "Not set".to_string());

        ManifestUpdater::new(manifest_path, custom_manifest)
            .update(&self.config.app.package_id)?;

        println!("[OK] AndroidManifest.xml merged successfully");
        let new_package = self.config.app.package_id.clone();
        self.record_change("AndroidManifest.xml package", old_package, new_package);
        Ok(())
    }

    pub fn merge_resources(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nMerging resources...");
        let manager = ResourceManager::new(&self.paths.src_dir, &self.paths.modded_dir);

        let diff = manager.list_differences()?;
        if diff.any() {
            println!("  Resource changes detected:");
            if !diff.new.is_empty() {
                println!("    New files: {}", diff.new.len());
            }
            if !diff.updated.is_empty() {
                println!("    Updated files: {}", diff.updated.len());
            }
            if !diff.missing.is_empty() {
                println!("    Files only in target: {}", diff.missing.len());
            }
        }

        let (dirs, files) = manager.merge_resources()?;
        if dirs > 0 || files > 0 {
            self.record_change(
                "Resources",
                "Original resources",
                format!("Merged with custom resources ({} files)", files),
            );
        }
        Ok(())
    }

    pub fn filter_abis(&mut self, _args: &CallArgs) -> StepResult {
        if self.config.abi.keep_only.is_empty() {
            return Ok(());
        }

        println!("\nFiltering ABI directories...");
        println!("    Keeping ABIs: {}", self.config.abi.keep_only.join(", "));

        let filter = AbiFilter::new(&self.paths.modded_dir, &self.config.abi);
        let kept = filter.filter(&mut self.diagnostics)?;

        if !kept.is_empty() {
            let names: Vec<String> = kept
                .iter()
                .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            println!("  [OK] ABI filtering complete. Kept: {}", names.join(", "));
            self.record_change("ABI Directories", "All", format!("Kept: {}", names.join(", ")));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // compilation steps
    // ------------------------------------------------------------------

    pub fn prepare_compilation_directories(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nPreparing compilation directories...");
        let temp = TempDirs::under(&self.paths.modded_dir);

        for dir in [&temp.classes, &temp.dex, &temp.src] {
            fs::create_dir_all(dir).map_err(|e| StepError::execution(e.to_string()))?;
            println!("  [OK] Created: {}", dir.display());
        }

        self.temp_dirs = Some(temp);
        Ok(())
    }

    pub fn find_android_jar(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nLocating Android framework...");
        let platforms_dir = self.android_sdk()?.join("platforms");
        if !platforms_dir.exists() {
            return Err(StepError::execution(format!(
                "platforms directory not found: {}",
                platforms_dir.display()
            )));
        }

        let latest = fs::read_dir(&platforms_dir)
            .map_err(|e| StepError::execution(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("android-"))
            })
            .max_by_key(|path| platform_api_level(path));

        let latest = latest.ok_or_else(|| {
            StepError::execution(format!("no Android platforms found in {}", platforms_dir.display()))
        })?;

        let android_jar = latest.join("android.jar");
        if !android_jar.exists() {
            return Err(StepError::execution(format!(
                "android.jar not found at {}",
                android_jar.display()
            )));
        }

        println!("  [OK] Using Android API {}", latest.file_name().and_then(|n| n.to_str()).unwrap_or("?"));
        println!("  [OK] android.jar: {}", android_jar.display());
        self.android_jar = Some(android_jar);
        Ok(())
    }

    pub fn find_source_files(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nScanning source files...");
        let structure = &self.config.paths.source_structure;

        self.java_files = collect_sources(&self.paths.project_root, &structure.java, "java");
        self.kotlin_files = collect_sources(&self.paths.project_root, &structure.kotlin, "kt");

        println!("  [OK] Found {} Java files", self.java_files.len());
        println!("  [OK] Found {} Kotlin files", self.kotlin_files.len());

        if self.java_files.is_empty() && self.kotlin_files.is_empty() {
            println!("  [INFO] No source files found");
        }
        Ok(())
    }

    pub fn find_library_jars(&mut self, _args: &CallArgs) -> StepResult {
        let libs_dir = match &self.paths.libs_dir {
            Some(dir) if dir.exists() => dir.clone(),
            _ => {
                println!("\n[INFO] No library JARs found");
                self.library_jars = Vec::new();
                return Ok(());
            }
        };

        println!("\nScanning library JARs...");
        self.library_jars = WalkDir::new(&libs_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "jar"))
            .map(|e| e.into_path())
            .collect();
        self.library_jars.sort();

        println!("  [OK] Found {} JAR files", self.library_jars.len());
        Ok(())
    }

    pub fn prepare_classpath(&mut self, _args: &CallArgs) -> StepResult {
        let android_jar = self
            .android_jar
            .as_ref()
            .ok_or_else(|| StepError::execution("android_jar not found. Run find_android_jar first"))?;

        let mut items = vec![android_jar.display().to_string()];
        items.extend(self.library_jars.iter().map(|j| j.display().to_string()));

        let separator = if cfg!(target_os = "windows") { ";" } else { ":" };
        self.classpath = Some(items.join(separator));
        println!("\nClasspath prepared with {} items", items.len());
        Ok(())
    }

    pub fn compile_java_files(&mut self, _args: &CallArgs) -> StepResult {
        if self.java_files.is_empty() {
            println!("  [INFO] No Java files to compile");
            return Ok(());
        }
        let classpath = self.classpath()?.to_string();
        let classes_dir = self.temp_dirs()?.classes.clone();

        println!("\nCompiling {} Java files...", self.java_files.len());
        let class_count = JavaCompiler::new().compile(&self.java_files, &classpath, &classes_dir)?;
        println!("  [OK] Generated {} class files", class_count);
        Ok(())
    }

    pub fn compile_kotlin_files(&mut self, _args: &CallArgs) -> StepResult {
        if self.kotlin_files.is_empty() {
            println!("  [INFO] No Kotlin files to compile");
            return Ok(());
        }
        let classpath = self.classpath()?.to_string();
        let classes_dir = self.temp_dirs()?.classes.clone();

        println!("\nCompiling {} Kotlin files...", self.kotlin_files.len());
        KotlinCompiler::new().compile(&self.kotlin_files, &classpath, &classes_dir)?;

        println!("  [OK] Generated {} class files", count_class_files(&classes_dir));
        Ok(())
    }

    pub fn verify_compilation(&mut self, _args: &CallArgs) -> StepResult {
        let classes_dir = self.temp_dirs()?.classes.clone();
        let class_count = count_class_files(&classes_dir);

        if class_count == 0 {
            return Err(StepError::execution(
                "no compiled classes found. Compilation failed",
            ));
        }

        println!("\nCompilation verification:");
        println!("  [OK] {} class files generated", class_count);
        Ok(())
    }

    pub fn create_jar_from_classes(&mut self, _args: &CallArgs) -> StepResult {
        let temp = self.temp_dirs()?.clone();
        println!("\nCreating JAR archive...");

        let jar_path = JarBuilder::new().create_jar(&temp.classes, &temp.jar)?;
        let size_kb = file_size_kb(&jar_path);
        println!("  [OK] JAR created: {} ({:.2} KB)", jar_path.display(), size_kb);

        self.temp_jar = Some(jar_path);
        Ok(())
    }

    pub fn combine_jars(&mut self, _args: &CallArgs) -> StepResult {
        let temp_jar = self
            .temp_jar
            .clone()
            .ok_or_else(|| StepError::execution("main JAR not created. Run create_jar_from_classes first"))?;

        if self.library_jars.is_empty() {
            println!("\nNo library JARs to combine");
            self.combined_jar = Some(temp_jar);
            return Ok(());
        }

        let temp = self.temp_dirs()?.clone();
        println!("\nCombining {} library JARs...", self.library_jars.len());

        let combined = JarBuilder::new().combine_jars(
            &temp_jar,
            &self.library_jars,
            &temp.combined,
            &self.paths.modded_dir,
        )?;

        println!("  [OK] Combined JAR: {} ({:.2} KB)", combined.display(), file_size_kb(&combined));
        self.combined_jar = Some(combined);
        Ok(())
    }

    pub fn convert_jar_to_dex(&mut self, _args: &CallArgs) -> StepResult {
        let combined_jar = self
            .combined_jar
            .clone()
            .ok_or_else(|| StepError::execution("combined JAR not created. Run combine_jars first"))?;
        let android_jar = self
            .android_jar
            .clone()
            .ok_or_else(|| StepError::execution("android_jar not found. Run find_android_jar first"))?;
        let dex_dir = self.temp_dirs()?.dex.clone();

        println!("\nConverting JAR to DEX...");
        let converter = DexConverter::new(self.android_sdk()?.to_path_buf());
        self.dex_files = converter.convert_to_dex(
            &combined_jar,
            &android_jar,
            &dex_dir,
            self.config.custom_rules.min_sdk_version,
        )?;

        println!("  [OK] Generated {} DEX files", self.dex_files.len());
        for dex in &self.dex_files {
            println!("    - {} ({:.2} KB)", dex.display(), file_size_kb(dex));
        }
        Ok(())
    }

    pub fn decompile_dex_to_smali(&mut self, _args: &CallArgs) -> StepResult {
        if self.dex_files.is_empty() {
            return Err(StepError::execution(
                "DEX files not created. Run convert_jar_to_dex first",
            ));
        }

        let baksmali = self
            .tools()?
            .baksmali_jar
            .clone()
            .ok_or_else(|| StepError::execution("baksmali jar not configured"))?;

        println!("\nDecompiling DEX to smali...");
        let decompiler = SmaliDecompiler::new(baksmali, self.paths.modded_dir.clone());
        let created = decompiler.decompile(&self.dex_files, self.config.build.target_dex_index)?;

        let mut smali_count = 0;
        for dir_name in &created {
            smali_count += WalkDir::new(self.paths.modded_dir.join(dir_name))
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "smali"))
                .count();
        }

        println!("  [OK] Created {} smali files in {}", smali_count, created.join(", "));
        Ok(())
    }

    pub fn merge_custom_smali(&mut self, _args: &CallArgs) -> StepResult {
        let dirs = self.config.existing_smali_dirs(&self.paths.project_root);
        if dirs.is_empty() {
            return Ok(());
        }

        println!("\nMerging custom smali files...");
        let target_root = self
            .paths
            .modded_dir
            .join(smali_dir_name(self.config.build.target_dex_index));

        let mut merged = 0;
        for custom_dir in dirs {
            for entry in WalkDir::new(&custom_dir).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file()
                    || !entry.path().extension().is_some_and(|ext| ext == "smali")
                {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if self.config.should_skip_file(&file_name) {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(&custom_dir)
                    .map_err(|e| StepError::execution(e.to_string()))?;
                let target = target_root.join(rel);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| StepError::execution(e.to_string()))?;
                }
                fs::copy(entry.path(), &target).map_err(|e| StepError::execution(e.to_string()))?;
                merged += 1;
            }
        }

        if merged > 0 {
            println!("  [OK] Merged {} smali files", merged);
            self.record_change("Custom smali files", "0", merged.to_string());
        }
        Ok(())
    }

    pub fn cleanup_temp_files(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nCleaning up temporary files...");
        let cleaner = FileCleaner::new();
        let temp = TempDirs::under(&self.paths.modded_dir);

        cleaner.cleanup_temp_dirs(&[temp.classes, temp.dex, temp.src]);
        cleaner.cleanup_temp_files(&[
            temp.jar,
            temp.combined,
            self.paths.project_root.join(UNSIGNED_APK),
            self.paths.project_root.join(ALIGNED_APK),
        ]);

        println!("[OK] Temporary files cleaned up");
        Ok(())
    }

    // ------------------------------------------------------------------
    // assembly and signing steps
    // ------------------------------------------------------------------

    pub fn build_unsigned_apk(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nBuilding unsigned APK...");
        let apktool_jar = self.tools()?.apktool_jar.clone();
        let output = self.paths.project_root.join(UNSIGNED_APK);

        ApkBuilder::new(apktool_jar).build(&self.paths.modded_dir, &output)?;

        println!("[OK] Unsigned APK: {}", output.display());
        self.unsigned_apk_path = Some(output);
        Ok(())
    }

    pub fn zipalign_apk(&mut self, args: &CallArgs) -> StepResult {
        let input = args.get_path(0)?;
        self.zipalign_inner(input)
    }

    fn zipalign_inner(&mut self, input: Option<PathBuf>) -> StepResult {
        println!("\nZipaligning APK...");
        let input = input
            .or_else(|| self.unsigned_apk_path.clone())
            .unwrap_or_else(|| self.paths.project_root.join(UNSIGNED_APK));
        let output = self.paths.project_root.join(ALIGNED_APK);

        let signer = ApkSigner::new(self.android_sdk()?.to_path_buf());
        let build_tools = signer.find_build_tools()?;
        let (zipalign, _) = signer.locate_tools(&build_tools)?;

        signer.zipalign(&zipalign, &input, &output)?;
        println!("[OK] Aligned APK: {}", output.display());
        self.aligned_apk_path = Some(output);
        Ok(())
    }

    pub fn sign_apk(&mut self, args: &CallArgs) -> StepResult {
        let input = args.get_path(0)?;
        let output = args.get_path(1)?;
        self.sign_inner(input, output)
    }

    fn sign_inner(&mut self, input: Option<PathBuf>, output: Option<PathBuf>) -> StepResult {
        println!("\nSigning APK...");
        let keystore = self
            .keystore
            .clone()
            .ok_or_else(|| StepError::execution("keystore not loaded. Run load_keystore_config first"))?;

        let input = input
            .or_else(|| self.aligned_apk_path.clone())
            .unwrap_or_else(|| self.paths.project_root.join(ALIGNED_APK));

        let output = output.unwrap_or_else(|| {
            let name = format!("{} ({}).apk", self.config.app.name, self.config.version.name);
            let sanitized: String = name.chars().filter(|c| !"<>:\"/\\|?*".contains(*c)).collect();
            self.paths.project_root.join(sanitized)
        });

        let signer = ApkSigner::new(self.android_sdk()?.to_path_buf());
        let build_tools = signer.find_build_tools()?;
        let (_, apksigner) = signer.locate_tools(&build_tools)?;

        signer.sign(&apksigner, &input, &output, &keystore)?;
        println!("[OK] Signed APK: {}", output.display());
        self.signed_apk_path = Some(output);
        Ok(())
    }

    pub fn verify_signature(&mut self, args: &CallArgs) -> StepResult {
        let apk = args.get_path(0)?;
        self.verify_signature_inner(apk)
    }

    fn verify_signature_inner(&mut self, apk: Option<PathBuf>) -> StepResult {
        println!("\nVerifying APK signature...");
        let apk = apk
            .or_else(|| self.signed_apk_path.clone())
            .filter(|p| p.exists())
            .ok_or_else(|| StepError::execution("no signed APK found"))?;

        let signer = ApkSigner::new(self.android_sdk()?.to_path_buf());
        let build_tools = signer.find_build_tools()?;
        let (_, apksigner) = signer.locate_tools(&build_tools)?;

        signer.verify(&apksigner, &apk)?;
        println!("[OK] Signature verified for {}", apk.display());
        Ok(())
    }

    /// Composite: unsigned build, zipalign, sign, verify, cleanup
    pub fn build_signed_apk(&mut self, args: &CallArgs) -> StepResult {
        self.build_unsigned_apk(args)?;
        self.zipalign_inner(None)?;
        self.sign_inner(None, None)?;
        self.verify_signature_inner(None)?;
        self.cleanup_temp_files(args)
    }

    pub fn cleanup_all(&mut self, args: &CallArgs) -> StepResult {
        println!("\nFull cleanup...");
        self.cleanup_temp_files(args)?;

        if self.paths.modded_dir.exists() {
            let _ = fs::remove_dir_all(&self.paths.modded_dir);
            println!("[OK] Removed {}", self.paths.modded_dir.display());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // reporting steps
    // ------------------------------------------------------------------

    pub fn show_apk_info(&mut self, args: &CallArgs) -> StepResult {
        let apk = args
            .get_path(0)?
            .or_else(|| self.signed_apk_path.clone());

        let apk = match apk.filter(|p| p.exists()) {
            Some(apk) => apk,
            None => {
                println!("[WARNING] No APK found");
                return Ok(());
            }
        };

        println!("\nAPK: {}", apk.display());
        println!("Size: {:.2} MB", file_size_kb(&apk) / 1024.0);
        if let Ok(meta) = fs::metadata(&apk) {
            if let Ok(modified) = meta.modified() {
                let stamp: DateTime<Local> = modified.into();
                println!("Modified: {}", stamp.format("%Y-%m-%d %H:%M"));
            }
        }
        Ok(())
    }

    pub fn list_apks(&mut self, _args: &CallArgs) -> StepResult {
        let mut apks: Vec<PathBuf> = fs::read_dir(&self.paths.project_root)
            .map_err(|e| StepError::execution(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "apk"))
            .collect();

        if apks.is_empty() {
            println!("No APK files found");
            return Ok(());
        }

        apks.sort_by_key(|apk| {
            std::cmp::Reverse(
                fs::metadata(apk)
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            )
        });

        println!("\nAPK files in project:");
        for apk in apks {
            let name = apk.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            println!("  {:<50} {:6.2} MB", name, file_size_kb(&apk) / 1024.0);
        }
        Ok(())
    }

    pub fn print_changed_values(&mut self, _args: &CallArgs) -> StepResult {
        println!("\nChanged Values:");
        println!("--------------------------------------------------");
        for item in &self.changed_values {
            println!("{:<35} : {} -> {}", item.name, item.old, item.new);
        }
        Ok(())
    }

    pub fn print_final_summary(&mut self, _args: &CallArgs) -> StepResult {
        let signed = self.signed_apk_path.clone().filter(|p| p.exists());
        let signed = match signed {
            Some(path) => path,
            None => {
                println!("\n[WARNING] Signed APK not found or not created");
                return Ok(());
            }
        };

        println!("\nAPK DETAILS");
        println!("==================================================");
        println!("File Name       : {}", signed.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        println!("Full Path       : {}", signed.display());
        println!("File Size       : {:.2} MB", file_size_kb(&signed) / 1024.0);
        println!("Package Name    : {}", self.config.app.package_id);
        println!("Version Code    : {}", self.config.version.code);
        println!("Version Name    : {}", self.config.version.name);
        println!("\n[OK] APK is ready and fully signed!");
        Ok(())
    }

    // ------------------------------------------------------------------
    // internal accessors
    // ------------------------------------------------------------------

    fn temp_dirs(&self) -> Result<&TempDirs, StepError> {
        self.temp_dirs.as_ref().ok_or_else(|| {
            StepError::execution("temp directories not created. Run prepare_compilation_directories first")
        })
    }

    fn classpath(&self) -> Result<&str, StepError> {
        self.classpath
            .as_deref()
            .ok_or_else(|| StepError::execution("classpath not prepared. Run prepare_classpath first"))
    }
}

fn platform_api_level(path: &Path) -> u32 {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("android-"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn collect_sources(project_root: &Path, dirs: &[String], extension: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for rel in dirs {
        let full = project_root.join(rel);
        if !full.exists() {
            println!("  Warning: source path not found: {}", rel);
            continue;
        }
        files.extend(
            WalkDir::new(&full)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == extension))
                .map(|e| e.into_path()),
        );
    }
    files.sort();
    files
}

fn file_size_kb(path: &Path) -> f64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0) as f64 / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge_core::config::PathsSection;

    fn config_json() -> &'static str {
        r#"{
            "version": {"code": 42, "name": "1.4.2"},
            "app": {"name": "Modded Game", "package_id": "com.example.mod"},
            "build": {"type": "release", "target_dex_index": 2, "auto_multidex": false}
        }"#
    }

    fn tool(root: &Path) -> BuildTool {
        let config: ProjectConfig = serde_json::from_str(config_json()).unwrap();
        let paths = PathTable::resolve(root, &PathsSection::default());
        BuildTool::new(paths, Arc::new(config))
    }

    #[test]
    fn test_verify_decompile_reports_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = tool(dir.path());
        fs::create_dir_all(tool.paths.modded_dir.join("res")).unwrap();

        let err = tool.verify_decompile_success(&CallArgs::new()).unwrap_err();
        assert!(err.to_string().contains("smali"));

        fs::create_dir_all(tool.paths.modded_dir.join("smali")).unwrap();
        assert!(tool.verify_decompile_success(&CallArgs::new()).is_ok());
    }

    #[test]
    fn test_steps_enforce_ordering_preconditions() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = tool(dir.path());

        let err = tool.run_apktool_decompile(&CallArgs::new()).unwrap_err();
        assert!(err.to_string().contains("find_tools"));

        // no java files at all: treated as a no-op, not an error
        assert!(tool.compile_java_files(&CallArgs::new()).is_ok());

        let err = tool.convert_jar_to_dex(&CallArgs::new()).unwrap_err();
        assert!(err.to_string().contains("combine_jars"));
    }

    #[test]
    fn test_update_apktool_yml_records_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = tool(dir.path());
        fs::create_dir_all(&tool.paths.modded_dir).unwrap();
        fs::write(
            tool.paths.modded_dir.join("apktool.yml"),
            "apkFileName: old.apk\nversionInfo:\n  versionCode: '7'\n  versionName: 1.0.7\n",
        )
        .unwrap();

        tool.update_apktool_yml(&CallArgs::new()).unwrap();

        assert_eq!(tool.changed_values.len(), 3);
        assert_eq!(tool.changed_values[0].new, "42");

        let text = fs::read_to_string(tool.paths.modded_dir.join("apktool.yml")).unwrap();
        assert!(text.contains("versionCode: 42"));
    }

    #[test]
    fn test_merge_custom_smali_respects_skip_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: ProjectConfig = serde_json::from_str(config_json()).unwrap();
        config.paths.additional_smali_dirs.push("patches".to_string());
        config.custom_rules.skip_files.push("Skip.smali".to_string());

        let paths = PathTable::resolve(dir.path(), &PathsSection::default());
        let mut tool = BuildTool::new(paths, Arc::new(config));

        fs::create_dir_all(dir.path().join("patches/com/example")).unwrap();
        fs::write(dir.path().join("patches/com/example/Keep.smali"), ".class").unwrap();
        fs::write(dir.path().join("patches/com/example/Skip.smali"), ".class").unwrap();

        tool.merge_custom_smali(&CallArgs::new()).unwrap();

        let target = tool.paths.modded_dir.join("smali_classes2/com/example");
        assert!(target.join("Keep.smali").exists());
        assert!(!target.join("Skip.smali").exists());
    }

    #[test]
    fn test_sign_without_keystore_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = tool(dir.path());
        let err = tool.sign_apk(&CallArgs::new()).unwrap_err();
        assert!(err.to_string().contains("load_keystore_config"));
    }
}
