//! Default locations for localbkup
//!
//! ## Path Resolution Order
//!
//! 1. Explicit `--config` / `--log-file` flags (or `LOCALBKUP_CONFIG`)
//! 2. Config file: `$XDG_CONFIG_HOME/localbkup.json` or `~/.config/localbkup.json`
//! 3. Log file: `~/.local/var/log/localbkup.log`

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::BackupError;

/// File name of the JSON configuration
pub const CONFIG_FILE_NAME: &str = "localbkup.json";

/// File name of the run log
pub const LOG_FILE_NAME: &str = "localbkup.log";

/// Resolves the default config and log locations
#[derive(Debug, Clone)]
pub struct LocalbkupPaths {
    /// Directory holding the config file
    config_dir: PathBuf,
    /// User's home directory
    home_dir: PathBuf,
}

impl LocalbkupPaths {
    /// Create a new LocalbkupPaths instance from the user's home directory
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, BackupError> {
        let dirs = BaseDirs::new()
            .ok_or_else(|| BackupError::Config("Could not determine home directory".into()))?;
        let home_dir = dirs.home_dir().to_path_buf();

        let config_dir = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir.join(".config"));

        Ok(Self {
            config_dir,
            home_dir,
        })
    }

    /// Create paths rooted at a custom home directory (useful for testing)
    pub fn with_home(home_dir: impl AsRef<Path>) -> Self {
        let home_dir = home_dir.as_ref().to_path_buf();
        Self {
            config_dir: home_dir.join(".config"),
            home_dir,
        }
    }

    /// Default configuration file ($XDG_CONFIG_HOME or ~/.config, then localbkup.json)
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Default log file (~/.local/var/log/localbkup.log)
    pub fn log_file(&self) -> PathBuf {
        self.home_dir
            .join(".local")
            .join("var")
            .join("log")
            .join(LOG_FILE_NAME)
    }
}
