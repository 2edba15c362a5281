//! Project layout, the `.stagehand/` marker directory and the project descriptor.
//!
//! A project is initialized when `.stagehand/build.json` exists. Nothing else
//! records which build stages have run; each stage detects its own completion.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets;
use crate::error::{Error, Result};
use crate::utils::io;

pub const MANIFEST_DIR: &str = ".stagehand";

/// Every path the build reads or writes, derived from the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.root.join(MANIFEST_DIR)
    }

    pub fn build_manifest(&self) -> PathBuf {
        self.manifest_dir().join("build.json")
    }

    pub fn default_config(&self) -> PathBuf {
        self.manifest_dir().join("config.default.json")
    }

    pub fn structure_sql(&self) -> PathBuf {
        self.manifest_dir().join("structure.sql")
    }

    pub fn data_sql(&self) -> PathBuf {
        self.manifest_dir().join("data.sql")
    }

    pub fn sections(&self) -> PathBuf {
        self.manifest_dir().join("sections.json")
    }

    pub fn postbuild_hook(&self) -> PathBuf {
        self.manifest_dir().join("postbuild.sh")
    }

    pub fn descriptor(&self) -> PathBuf {
        self.manifest_dir().join("project")
    }

    /// Root of every cloned dependency.
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.lib_dir().join("extensions")
    }

    pub fn output_manifest_dir(&self) -> PathBuf {
        self.root.join("var").join("manifest")
    }

    pub fn final_config(&self) -> PathBuf {
        self.output_manifest_dir().join("config.json")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.root.join("vendor")
    }

    /// Resolve a project-relative path from defaults (e.g. the console binary).
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    pub fn is_initialized(&self) -> bool {
        self.manifest_dir().is_dir() && self.build_manifest().is_file()
    }

    pub fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::project_not_initialized(self.root.to_string_lossy()))
        }
    }
}

/// Contents of `.stagehand/project`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectDescriptor {
    pub name: String,
    pub created: String,
    pub tool_version_id: String,
    #[serde(default)]
    pub last_built: Option<String>,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            created: now(),
            tool_version_id: tool_version_id()?,
            last_built: None,
        })
    }

    pub fn load(layout: &ProjectLayout) -> Result<Self> {
        let path = layout.descriptor();
        let content = io::read_file(&path, "read project descriptor")?;
        serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.to_string_lossy(), e))
    }

    pub fn save(&self, layout: &ProjectLayout) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize project descriptor".to_string()))
        })?;
        io::write_file_atomic(&layout.descriptor(), &content, "write project descriptor")
    }
}

/// Numeric tool version: major * 10000 + minor * 100 + patch.
pub fn tool_version_id() -> Result<String> {
    let version = semver::Version::parse(env!("CARGO_PKG_VERSION"))
        .map_err(|e| Error::internal_unexpected(format!("Invalid package version: {}", e)))?;
    Ok((version.major * 10000 + version.minor * 100 + version.patch).to_string())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutput {
    pub name: String,
    pub root: String,
    pub files: Vec<String>,
}

/// Create `.stagehand/` from the bundled template and write the descriptor.
///
/// Refuses to touch a project that already has the marker directory or an
/// installed companion extension.
pub fn init(layout: &ProjectLayout, name: Option<&str>, companion_name: &str) -> Result<InitOutput> {
    if !layout.root().is_dir() {
        return Err(Error::validation_invalid_argument(
            "working-directory",
            format!("{} is not a directory", layout.root().display()),
        ));
    }

    let companion = layout.extensions_dir().join(companion_name);
    for existing in [layout.manifest_dir(), companion] {
        if existing.exists() {
            return Err(Error::project_already_initialized(existing.to_string_lossy()));
        }
    }

    let name = match name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => default_name(layout.root()),
    };

    fs::create_dir_all(layout.manifest_dir())
        .map_err(|e| Error::internal_io(e.to_string(), Some("create .stagehand".to_string())))?;

    let mut files = assets::write_bundle(assets::PROJECT_TEMPLATE, &layout.manifest_dir())?;

    ProjectDescriptor::new(&name)?.save(layout)?;
    files.push(layout.descriptor());

    crate::log_status!("init", "Initialized project '{}' in {}", name, layout.root().display());

    Ok(InitOutput {
        name,
        root: layout.root().to_string_lossy().to_string(),
        files: files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
    })
}

/// Stamp `last-built` after a successful build. A missing descriptor is recreated.
pub fn mark_built(layout: &ProjectLayout) -> Result<ProjectDescriptor> {
    let mut descriptor = if layout.descriptor().is_file() {
        ProjectDescriptor::load(layout)?
    } else {
        ProjectDescriptor::new(default_name(layout.root()))?
    };
    descriptor.last_built = Some(now());
    descriptor.save(layout)?;
    Ok(descriptor)
}

fn default_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}
