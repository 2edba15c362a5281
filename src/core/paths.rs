use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base stagehand config directory (~/.config/stagehand/ on all platforms)
pub fn stagehand() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows")
        })?;
        Ok(PathBuf::from(appdata).join("stagehand"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected("HOME environment variable not set on Unix-like system")
        })?;
        Ok(PathBuf::from(home).join(".config").join("stagehand"))
    }
}

/// Global stagehand.json settings file path
pub fn stagehand_json() -> Result<PathBuf> {
    Ok(stagehand()?.join("stagehand.json"))
}
