//
//  aem-cli
//  config/file.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration File I/O
//!
//! Locating, reading and writing the TOML configuration file.
//!
//! The location defaults to the platform config directory and can be overridden
//! with the `AEM_CONFIG` environment variable, which is what the integration
//! tests rely on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "AEM_CONFIG";

/// Returns the path of the configuration file.
///
/// | Platform | Path |
/// |----------|------|
/// | Linux | `~/.config/aem/config.toml` |
/// | macOS | `~/Library/Application Support/aem/config.toml` |
/// | Windows | `C:\Users\<User>\AppData\Roaming\aem\config.toml` |
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let dirs = ProjectDirs::from("", "", crate::APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Reads the configuration file, returning `None` when it does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(content))
}

/// Writes the configuration file, creating parent directories as needed.
pub fn write_config_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(read_config_file(&path).unwrap().is_none());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/config.toml");
        write_config_file(&path, "active_environment = \"dev\"\n").unwrap();
        assert_eq!(
            read_config_file(&path).unwrap().as_deref(),
            Some("active_environment = \"dev\"\n")
        );
    }
}
