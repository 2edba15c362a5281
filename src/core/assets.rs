//! Files compiled into the binary: the project template and the companion extension.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct BundledFile {
    pub path: &'static str,
    pub contents: &'static str,
}

/// Copied into `.stagehand/` by `init`.
pub const PROJECT_TEMPLATE: &[BundledFile] = &[
    BundledFile {
        path: "build.json",
        contents: include_str!("../../assets/project/build.json"),
    },
    BundledFile {
        path: "config.default.json",
        contents: include_str!("../../assets/project/config.default.json"),
    },
];

/// Installed into `lib/extensions/<companion>` on every build. Metadata only, no PHP sources.
pub const COMPANION_EXTENSION: &[BundledFile] = &[
    BundledFile {
        path: "composer.json",
        contents: include_str!("../../assets/companion/composer.json"),
    },
    BundledFile {
        path: "extension.meta.xml",
        contents: include_str!("../../assets/companion/extension.meta.xml"),
    },
];

/// Write every file under `dest`, creating directories and overwriting existing files.
pub fn write_bundle(files: &[BundledFile], dest: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let target = dest.join(file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
            })?;
        }
        fs::write(&target, file.contents).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("write {}", target.display())))
        })?;
        written.push(target);
    }
    Ok(written)
}
