//! Backup configuration
//!
//! The configuration is read once per run from a JSON object:
//!
//! ```json
//! {
//!     "destination_folder": "/mnt/backups",
//!     "files": ["/home/me/docs", "/etc/fstab"],
//!     "exclude": ["/home/me/docs/cache"],
//!     "password": "correct horse battery staple",
//!     "keep_count": 7
//! }
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crypto::SecureString;
use crate::error::{BackupError, BackupResult};

/// Which encryption stage protects the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMethod {
    /// Symmetric gpg, `.gpg` suffix
    #[default]
    Gpg,
    /// In-process Argon2id + AES-256-GCM, `.enc` suffix
    Native,
}

/// Raw shape of the JSON file; required fields are checked in `validate`
#[derive(Deserialize)]
struct RawConfiguration {
    destination_folder: Option<PathBuf>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    password: Option<SecureString>,
    keep_count: Option<u32>,
    #[serde(default)]
    encryption: EncryptionMethod,
}

/// Immutable configuration for one backup run
#[derive(Clone)]
pub struct Configuration {
    /// Folder receiving the final artifacts
    pub destination_folder: PathBuf,
    /// Paths handed to the archiver, in order
    pub source_files: Vec<String>,
    /// Exclusion patterns handed to the archiver, in order
    pub exclude_files: Vec<String>,
    /// Passphrase for the encryption stage
    pub password: SecureString,
    /// Number of artifacts to keep; `None` keeps all of them
    pub keep_count: Option<u32>,
    /// Encryption stage to use
    pub encryption: EncryptionMethod,
}

impl Configuration {
    /// Build a configuration directly (useful for testing)
    pub fn new(
        destination_folder: impl Into<PathBuf>,
        source_files: Vec<String>,
        exclude_files: Vec<String>,
        password: impl Into<SecureString>,
        keep_count: Option<u32>,
    ) -> Self {
        Self {
            destination_folder: destination_folder.into(),
            source_files,
            exclude_files,
            password: password.into(),
            keep_count,
            encryption: EncryptionMethod::default(),
        }
    }

    /// Use a different encryption stage
    pub fn with_encryption(mut self, encryption: EncryptionMethod) -> Self {
        self.encryption = encryption;
        self
    }

    /// Load the configuration from a JSON file
    pub fn load(path: &Path) -> BackupResult<Self> {
        let file = File::open(path).map_err(|e| {
            BackupError::Config(format!(
                "Failed to open config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            BackupError::Config(msg) => {
                BackupError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse the configuration from any JSON source
    pub fn from_reader<R: Read>(reader: R) -> BackupResult<Self> {
        let raw: RawConfiguration = serde_json::from_reader(reader)
            .map_err(|e| BackupError::Config(format!("Failed to parse config: {}", e)))?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfiguration) -> BackupResult<Self> {
        let destination_folder = raw
            .destination_folder
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| BackupError::Config("missing field `destination_folder`".into()))?;

        let password = raw
            .password
            .ok_or_else(|| BackupError::Config("missing field `password`".into()))?;

        Ok(Self {
            destination_folder,
            source_files: raw.files,
            exclude_files: raw.exclude,
            password,
            keep_count: raw.keep_count,
            encryption: raw.encryption,
        })
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("destination_folder", &self.destination_folder)
            .field("source_files", &self.source_files.len())
            .field("exclude_files", &self.exclude_files.len())
            .field("keep_count", &self.keep_count)
            .field("encryption", &self.encryption)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_reader() {
        let json = r#"{
            "files": ["/home/foo/bar", "/home/bar/foo"],
            "password": "foo",
            "destination_folder": "/destination"
        }"#;

        let config = Configuration::from_reader(json.as_bytes()).unwrap();

        assert_eq!(config.destination_folder, PathBuf::from("/destination"));
        assert_eq!(config.source_files, vec!["/home/foo/bar", "/home/bar/foo"]);
        assert_eq!(config.password.as_str(), "foo");
        assert!(config.exclude_files.is_empty());
        assert_eq!(config.keep_count, None);
        assert_eq!(config.encryption, EncryptionMethod::Gpg);
    }

    #[test]
    fn test_from_reader_with_exclude_and_keep_count() {
        let json = r#"{
            "destination_folder": "/d",
            "password": "p",
            "exclude": ["foo", "bar/baz"],
            "keep_count": 3,
            "encryption": "native"
        }"#;

        let config = Configuration::from_reader(json.as_bytes()).unwrap();

        assert_eq!(config.exclude_files, vec!["foo", "bar/baz"]);
        assert!(config.source_files.is_empty());
        assert_eq!(config.keep_count, Some(3));
        assert_eq!(config.encryption, EncryptionMethod::Native);
    }

    #[test]
    fn test_missing_password() {
        let json = r#"{"destination_folder": "/d"}"#;
        let err = Configuration::from_reader(json.as_bytes()).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_missing_destination() {
        let json = r#"{"password": "p", "files": []}"#;
        let err = Configuration::from_reader(json.as_bytes()).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("destination_folder"));
    }

    #[test]
    fn test_negative_keep_count_rejected() {
        let json = r#"{"destination_folder": "/d", "password": "p", "keep_count": -1}"#;
        let err = Configuration::from_reader(json.as_bytes()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Configuration::load(&temp_dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("localbkup.json");
        std::fs::write(&path, r#"{"destination_folder": "/d", "password": "p"}"#).unwrap();

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.destination_folder, PathBuf::from("/d"));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = Configuration::new("/d", vec![], vec![], "topsecret", Some(2));
        let debug = format!("{:?}", config);
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("keep_count"));
    }
}
