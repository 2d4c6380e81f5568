//! Settings file location

use crate::error::{CliError, CliResult};
use std::path::{Path, PathBuf};

/// Settings file used when neither `--settings` nor the env var is given.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV_VAR: &str = "CRMLINK_SETTINGS";

/// Resolved location of the settings file
#[derive(Debug, Clone)]
pub struct SettingsPaths {
    /// Path to the settings JSON file
    pub settings_file: PathBuf,
    /// Directory relative paths inside the settings file resolve against
    pub base_dir: PathBuf,
}

impl SettingsPaths {
    /// Resolve the settings file from an explicit path, falling back to
    /// `appsettings.json` in the working directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let settings_file = explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::for_file(settings_file)
    }

    /// Paths for a specific settings file
    pub fn for_file(settings_file: impl Into<PathBuf>) -> Self {
        let settings_file = settings_file.into();
        let base_dir = settings_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            settings_file,
            base_dir,
        }
    }

    /// Resolve a path found in the settings file
    pub fn resolve_relative(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Read the settings file
    pub fn read(&self) -> CliResult<String> {
        std::fs::read_to_string(&self.settings_file).map_err(|e| {
            CliError::Config(format!(
                "Cannot read settings file {}: {e}",
                self.settings_file.display()
            ))
        })
    }
}
