//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Read file contents, reporting failures as `internal.io_error` tagged with `operation`.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} ({})", operation, path.display())))
    })
}

/// Write `content` next to `path` as `<name>.tmp`, then rename over `path`.
///
/// Readers see either the old file or the new one. Missing parent
/// directories are created.
pub fn write_file_atomic(path: &Path, content: &str, operation: &str) -> Result<()> {
    let invalid = || {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(operation.to_string()),
        )
    };
    let parent = path.parent().ok_or_else(invalid)?;
    let filename = path.file_name().ok_or_else(invalid)?;

    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("{} (create parent)", operation)))
        })?;
    }

    let tmp_path = parent.join(format!("{}.tmp", filename.to_string_lossy()));
    fs::write(&tmp_path, content)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("{} (write temp)", operation))))?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::internal_io(e.to_string(), Some(format!("{} (rename)", operation))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_io_error_naming_the_operation() {
        let err = read_file(Path::new("/nonexistent/build.json"), "read build manifest").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
        assert!(err.details["context"]
            .as_str()
            .unwrap_or_default()
            .starts_with("read build manifest"));
    }

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var/manifest/config.json");

        write_file_atomic(&path, "{}", "write configuration").unwrap();
        write_file_atomic(&path, "{\"a\":1}", "write configuration").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}");
        assert!(!dir.path().join("var/manifest/config.json.tmp").exists());
    }
}
