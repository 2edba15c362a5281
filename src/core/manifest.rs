//! The build manifest (`.stagehand/build.json`) and its descriptors.
//!
//! Descriptors are read as written and resolved into absolute targets under
//! `lib/` (libraries) or `lib/extensions/` (extensions) before installation.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EffectiveConfiguration;
use crate::error::{Error, Result};
use crate::project::ProjectLayout;
use crate::utils::io;

static REPOSITORY_DIRNAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)/([^/]+)\.git$").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<DependencyDescriptor>,
    #[serde(default)]
    pub extensions: Vec<DependencyDescriptor>,
    #[serde(default, rename = "symbolic-links")]
    pub symbolic_links: Vec<SymlinkSpec>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositorySpec>,
    /// Extensions only: enable through the platform console after the build.
    #[serde(default = "default_install")]
    pub install: bool,
    #[serde(default)]
    pub cleanup: Vec<String>,
}

fn default_install() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositorySpec {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymlinkSpec {
    pub src: String,
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub username: String,
    pub email: String,
}

impl BuildManifest {
    pub fn load(layout: &ProjectLayout) -> Result<Self> {
        let path = layout.build_manifest();
        let content = io::read_file(&path, "read build manifest")?;
        serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.to_string_lossy(), e))
    }

    /// The `config` block as grouped overrides. Absent means no overrides.
    pub fn config_overrides(&self) -> Result<EffectiveConfiguration> {
        match &self.config {
            Value::Null => Ok(EffectiveConfiguration::default()),
            value => EffectiveConfiguration::from_value(value.clone(), "build.json config"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Library,
    Extension,
}

/// A descriptor with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDependency {
    pub kind: DependencyKind,
    pub name: String,
    pub repository: Option<ResolvedRepository>,
    pub target: PathBuf,
    pub install: bool,
    pub cleanup: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRepository {
    pub url: String,
    pub branch: String,
}

impl ResolvedDependency {
    /// Name passed to the platform console; any `extensions/` prefix is dropped.
    pub fn extension_handle(&self) -> &str {
        self.name.strip_prefix("extensions/").unwrap_or(&self.name)
    }
}

/// Final path segment of a `.git` URL: `https://host/org/repo.git` -> `repo`.
pub fn dirname_from_repository_url(url: &str) -> Result<String> {
    REPOSITORY_DIRNAME
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::package_invalid_repository(url))
}

/// Reject absolute paths and `..` so targets stay under their root.
pub fn relative_path(value: &str, field: &str) -> Result<PathBuf> {
    let trimmed = value.trim_start_matches('/');
    let path = Path::new(trimmed);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if trimmed.is_empty() || escapes {
        return Err(Error::config_invalid_value(
            field,
            Some(value.to_string()),
            "Path must stay inside the project",
        ));
    }
    Ok(path.to_path_buf())
}

pub fn resolve_dependency(
    descriptor: &DependencyDescriptor,
    kind: DependencyKind,
    layout: &ProjectLayout,
    default_branch: &str,
) -> Result<ResolvedDependency> {
    let (name, relative, repository) = match &descriptor.repository {
        Some(repo) => {
            let dirname = dirname_from_repository_url(&repo.url)?;
            let name = descriptor.name.clone().unwrap_or_else(|| dirname.clone());
            let target = repo.target.clone().unwrap_or(dirname);
            let branch = repo
                .branch
                .clone()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| default_branch.to_string());
            (
                name,
                target,
                Some(ResolvedRepository {
                    url: repo.url.clone(),
                    branch,
                }),
            )
        }
        None => {
            let name = descriptor
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| {
                    Error::config_invalid_value(
                        "name",
                        None,
                        "A dependency without a repository needs a name",
                    )
                })?;
            let target = name.strip_prefix("extensions/").unwrap_or(&name).to_string();
            (name, target, None)
        }
    };

    let relative = relative_path(&relative, "repository.target")?;
    let target = match kind {
        DependencyKind::Library => layout.lib_dir().join(relative),
        DependencyKind::Extension => layout.extensions_dir().join(relative),
    };

    Ok(ResolvedDependency {
        kind,
        name,
        repository,
        target,
        install: descriptor.install,
        cleanup: descriptor.cleanup.clone(),
    })
}

/// A symlink with its destination directory and link name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSymlink {
    pub src: String,
    pub dest_dir: PathBuf,
    pub name: String,
}

pub fn resolve_symlink(spec: &SymlinkSpec, layout: &ProjectLayout) -> Result<ResolvedSymlink> {
    let name = match &spec.name {
        Some(n) if !n.trim().is_empty() => n.clone(),
        _ => Path::new(spec.src.trim_end_matches('/'))
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::config_invalid_value(
                    "symbolic-links.src",
                    Some(spec.src.clone()),
                    "Cannot derive a link name",
                )
            })?,
    };

    let dest = spec.dest.trim_start_matches('/');
    let dest_dir = if dest.is_empty() {
        layout.root().to_path_buf()
    } else {
        layout.root().join(relative_path(dest, "symbolic-links.dest")?)
    };

    Ok(ResolvedSymlink {
        src: spec.src.clone(),
        dest_dir,
        name,
    })
}
