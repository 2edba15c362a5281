use serde::{Deserialize, Serialize};
use std::fs;

use crate::paths;

/// Root structure of ~/.config/stagehand/stagehand.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StagehandConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// Everything that can be overridden via stagehand.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub programs: ProgramsConfig,

    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default = "default_canonical_table")]
    pub canonical_table: String,

    #[serde(default = "default_password_length")]
    pub password_length: usize,

    #[serde(default)]
    pub platform: PlatformConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            programs: ProgramsConfig::default(),
            default_branch: default_branch(),
            canonical_table: default_canonical_table(),
            password_length: default_password_length(),
            platform: PlatformConfig::default(),
        }
    }
}

/// Executables stagehand drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsConfig {
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_composer")]
    pub composer: String,
    #[serde(default = "default_mysql")]
    pub mysql: String,
    #[serde(default = "default_mysqldump")]
    pub mysqldump: String,
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            composer: default_composer(),
            mysql: default_mysql(),
            mysqldump: default_mysqldump(),
            shell: default_shell(),
        }
    }
}

/// Layout of the platform install inside a project, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_docroot")]
    pub docroot: String,
    #[serde(default = "default_console")]
    pub console: String,
    #[serde(default = "default_preboot_config")]
    pub preboot_config: String,
    #[serde(default = "default_section_importer")]
    pub section_importer: String,
    #[serde(default = "default_companion_name")]
    pub companion_name: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            docroot: default_docroot(),
            console: default_console(),
            preboot_config: default_preboot_config(),
            section_importer: default_section_importer(),
            companion_name: default_companion_name(),
        }
    }
}

fn default_git() -> String {
    "git".to_string()
}

fn default_composer() -> String {
    "composer".to_string()
}

fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_mysqldump() -> String {
    "mysqldump".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_canonical_table() -> String {
    "tbl_authors".to_string()
}

fn default_password_length() -> usize {
    12
}

fn default_docroot() -> String {
    "lib/symphony".to_string()
}

fn default_console() -> String {
    "lib/symphony/extensions/console/bin/symphony".to_string()
}

fn default_preboot_config() -> String {
    "var/manifest/preboot.json".to_string()
}

fn default_section_importer() -> String {
    "lib/section-builder/bin/import".to_string()
}

fn default_companion_name() -> String {
    "stagehand".to_string()
}

/// Load defaults from stagehand.json, falling back to built-ins when the file
/// is missing or unreadable.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

pub fn load_config() -> StagehandConfig {
    let Ok(path) = paths::stagehand_json() else {
        return StagehandConfig::default();
    };

    if !path.exists() {
        return StagehandConfig::default();
    }

    match fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(_) => StagehandConfig::default(),
    }
}

fn parse_config(content: &str) -> StagehandConfig {
    serde_json::from_str(content).unwrap_or_default()
}
