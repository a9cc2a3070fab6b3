use crate::backup::BackupOptions;
use crate::error::{BackupError, Result};
use crate::export_root::ExportRoot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration structure for the backup tooling.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// The user-configured export root that holds the per-title backup folders.
    pub export_root: Option<String>,
    /// Number of threads used to copy save files; defaults to the available parallelism.
    #[serde(default)]
    pub copy_workers: Option<usize>,
    /// Remove a partially copied backup folder when a backup fails.
    #[serde(default)]
    pub cleanup_partial_backups: bool,
}

impl AppConfig {
    /// Sets the export root after checking that it is an existing directory.
    pub fn set_export_root(&mut self, path: &str) -> Result<()> {
        log::info!("Attempting to set export root to: {}", path);

        if !is_valid_dir(path) {
            log::warn!("Validation failed: Path does not exist or is not a directory");
            return Err(BackupError::NotFound {
                path: PathBuf::from(path),
            });
        }

        self.export_root = Some(path.to_string());
        Ok(())
    }

    /// Opens the configured export root, if one is set.
    pub fn open_export_root(&self) -> Result<Option<ExportRoot>> {
        self.export_root
            .as_deref()
            .map(ExportRoot::new)
            .transpose()
    }

    /// Builds backup options from the configured worker count and cleanup policy.
    pub fn backup_options(&self) -> BackupOptions {
        let mut options = BackupOptions {
            cleanup_on_failure: self.cleanup_partial_backups,
            ..BackupOptions::default()
        };
        if let Some(workers) = self.copy_workers {
            options.workers = workers.max(1);
        }
        options
    }
}

/// Resolves the path to the configuration file.
///
/// Attempts to locate `config.json` in the same directory as the executable.
/// Defaults to `config.json` in the current working directory if the executable path cannot be determined.
pub fn get_config_path() -> PathBuf {
    std::env::current_exe()
        .map(|p| p.parent().unwrap_or(Path::new(".")).join("config.json"))
        .unwrap_or_else(|_| PathBuf::from("config.json"))
}

/// Loads configuration from a specific file path.
///
/// Returns `AppConfig::default()` if the file does not exist or cannot be parsed.
pub fn load_config_from_path(path: &Path) -> AppConfig {
    log::info!("Loading configuration from: {:?}", path);
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    log::info!("Configuration loaded successfully");
                    return config;
                }
                Err(e) => log::error!("Failed to parse configuration: {}", e),
            },
            Err(e) => log::error!("Failed to read configuration file: {}", e),
        }
    } else {
        log::info!("Configuration file not found, using defaults");
    }
    AppConfig::default()
}

/// Loads the initial configuration from the default location.
pub fn load_initial_config() -> AppConfig {
    load_config_from_path(&get_config_path())
}

/// Persists the configuration as pretty-printed JSON.
pub fn save_config_to_path(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).map_err(|source| BackupError::Config {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|e| {
        log::error!("Failed to write config file: {}", e);
        BackupError::io(path, e)
    })?;

    log::info!("Configuration saved successfully to {:?}", path);
    Ok(())
}

/// Validates if the provided string is a valid directory path.
fn is_valid_dir(path: &str) -> bool {
    Path::new(path).is_dir()
}
