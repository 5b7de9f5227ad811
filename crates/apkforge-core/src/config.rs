//! Build configuration loaded from build_config.json

use crate::error::{CoreError, Result};
use crate::policy::PipelinePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub version: VersionSection,
    pub app: AppSection,
    pub build: BuildSection,

    #[serde(default)]
    pub dex_placement: DexPlacementSection,

    #[serde(default)]
    pub custom_rules: CustomRulesSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub abi: AbiSection,

    /// Ordered step descriptors to execute
    #[serde(default)]
    pub pipeline: Vec<String>,

    #[serde(default)]
    pub pipeline_behavior: PipelinePolicy,

    /// Print the available step names before running
    #[serde(default)]
    pub debug_pipeline: bool,

    /// Persist pipeline_report.json after the run
    #[serde(default)]
    pub save_pipeline_report: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSection {
    pub code: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
    pub package_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(rename = "type")]
    pub build_type: String,
    #[serde(default)]
    pub target_dex_index: usize,
    #[serde(default)]
    pub auto_multidex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexPlacementSection {
    #[serde(default = "default_true")]
    pub prefer_existing: bool,
    #[serde(default = "default_true")]
    pub create_new_if_full: bool,
    #[serde(default = "default_max_files_per_dex")]
    pub max_files_per_dex: usize,
}

impl Default for DexPlacementSection {
    fn default() -> Self {
        Self {
            prefer_existing: true,
            create_new_if_full: true,
            max_files_per_dex: default_max_files_per_dex(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRulesSection {
    #[serde(default)]
    pub skip_files: Vec<String>,
    #[serde(default)]
    pub force_multidex: bool,
    #[serde(default = "default_min_sdk")]
    pub min_sdk_version: u32,
}

impl Default for CustomRulesSection {
    fn default() -> Self {
        Self {
            skip_files: Vec::new(),
            force_multidex: false,
            min_sdk_version: default_min_sdk(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Keystore configuration file, relative to the project root
    #[serde(default = "default_keystore")]
    pub keystore: String,

    #[serde(default)]
    pub additional_smali_dirs: Vec<String>,

    #[serde(default)]
    pub directories: DirectoriesSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub source_structure: SourceStructureSection,

    /// Optional directory of library JARs to bundle
    #[serde(default)]
    pub libs: Option<String>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            keystore: default_keystore(),
            additional_smali_dirs: Vec::new(),
            directories: DirectoriesSection::default(),
            tools: ToolsSection::default(),
            source_structure: SourceStructureSection::default(),
            libs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoriesSection {
    #[serde(default = "default_original_dir")]
    pub original: String,
    #[serde(default = "default_modded_dir")]
    pub modded: String,
    #[serde(default = "default_src_dir")]
    pub src: String,
}

impl Default for DirectoriesSection {
    fn default() -> Self {
        Self {
            original: default_original_dir(),
            modded: default_modded_dir(),
            src: default_src_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsSection {
    pub apktool: Option<String>,
    pub baksmali: Option<String>,
    pub smali: Option<String>,
    pub android_sdk: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStructureSection {
    #[serde(default)]
    pub java: Vec<String>,
    #[serde(default)]
    pub kotlin: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiSection {
    #[serde(default)]
    pub keep_only: Vec<String>,
    #[serde(default = "default_true")]
    pub remove_others: bool,
    #[serde(default = "default_true")]
    pub warn_if_missing: bool,
}

impl Default for AbiSection {
    fn default() -> Self {
        Self {
            keep_only: Vec::new(),
            remove_others: true,
            warn_if_missing: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_files_per_dex() -> usize {
    60000
}

fn default_min_sdk() -> u32 {
    21
}

fn default_keystore() -> String {
    "keystore.json".to_string()
}

fn default_original_dir() -> String {
    "OriginalGame".to_string()
}

fn default_modded_dir() -> String {
    "ModdedGame".to_string()
}

fn default_src_dir() -> String {
    "src".to_string()
}

impl ProjectConfig {
    /// Load build_config.json from the project root
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join("build_config.json");
        if !config_path.exists() {
            return Err(CoreError::ConfigNotFound(config_path));
        }

        let text = fs::read_to_string(&config_path).map_err(|source| CoreError::Io {
            path: config_path.clone(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| CoreError::InvalidJson {
            path: config_path,
            source,
        })
    }

    /// Apply BUILD_* environment overrides, returning the fields changed
    pub fn update_from_env(&mut self) -> Vec<&'static str> {
        let mut updated = Vec::new();

        if let Some(code) = env_parse::<u32>("BUILD_VERSION_CODE") {
            self.version.code = code;
            updated.push("version_code");
        }
        if let Ok(name) = std::env::var("BUILD_VERSION_NAME") {
            self.version.name = name;
            updated.push("version_name");
        }
        if let Ok(name) = std::env::var("BUILD_APP_NAME") {
            self.app.name = name;
            updated.push("app_name");
        }
        if let Ok(id) = std::env::var("BUILD_PACKAGE_ID") {
            self.app.package_id = id;
            updated.push("application_id");
        }
        if let Ok(build_type) = std::env::var("BUILD_TYPE") {
            self.build.build_type = build_type;
            updated.push("build_type");
        }
        if let Some(index) = env_parse::<usize>("BUILD_TARGET_DEX") {
            self.build.target_dex_index = index;
            updated.push("target_dex_index");
        }
        if let Ok(value) = std::env::var("BUILD_AUTO_MULTIDEX") {
            self.build.auto_multidex = value.eq_ignore_ascii_case("true");
            updated.push("auto_multidex");
        }

        updated
    }

    pub fn should_skip_file(&self, filename: &str) -> bool {
        self.custom_rules.skip_files.iter().any(|f| f == filename)
    }

    pub fn keystore_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.paths.keystore)
    }

    /// Additional smali directories that actually exist on disk
    pub fn existing_smali_dirs(&self, project_root: &Path) -> Vec<PathBuf> {
        self.paths
            .additional_smali_dirs
            .iter()
            .map(|rel| project_root.join(rel))
            .filter(|p| p.exists())
            .collect()
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

/// Keystore credentials for APK signing, loaded from keystore.json
#[derive(Debug, Clone, Deserialize)]
pub struct KeystoreConfig {
    #[serde(rename = "keystore_path")]
    pub path: PathBuf,
    #[serde(rename = "keystore_alias")]
    pub alias: String,
    #[serde(rename = "keystore_password")]
    pub password: String,
    pub key_password: String,
}

impl KeystoreConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(CoreError::Keystore(format!(
                "keystore.json not found at: {}",
                config_path.display()
            )));
        }

        let text = fs::read_to_string(config_path).map_err(|source| CoreError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| CoreError::InvalidJson {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Resolve the keystore path against the project root and check the
    /// file exists. Must run before signing.
    pub fn validate(&mut self, project_root: &Path) -> Result<()> {
        let mut missing = Vec::new();
        if self.path.as_os_str().is_empty() {
            missing.push("keystore_path");
        }
        if self.alias.is_empty() {
            missing.push("keystore_alias");
        }
        if self.password.is_empty() {
            missing.push("keystore_password");
        }
        if self.key_password.is_empty() {
            missing.push("key_password");
        }
        if !missing.is_empty() {
            return Err(CoreError::Keystore(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if self.path.is_relative() {
            self.path = project_root.join(&self.path);
        }

        if !self.path.exists() {
            return Err(CoreError::Keystore(format!(
                "keystore file not found: {}",
                self.path.display()
            )));
        }

        Ok(())
    }
}
