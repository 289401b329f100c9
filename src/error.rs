//! Custom error types for localbkup
//!
//! Every failure of a backup run maps to one variant of [`BackupError`].
//! Nothing is retried; the variant only tells the caller (and the log) which
//! step of the run gave up.

use thiserror::Error;

/// The main error type for localbkup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Missing/unreadable configuration or a missing required field
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external stage (archive or encrypt) reported failure
    #[error("{stage} stage failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },

    /// The destination directory could not be created or the copy failed
    #[error("Placement error: {0}")]
    Placement(String),

    /// An old artifact could not be deleted
    #[error("Retention error: {0}")]
    Retention(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Log sink could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// SIGINT/SIGTERM arrived during the run
    #[error("Interrupted by signal")]
    Interrupted,
}

impl BackupError {
    /// Create a failure for the archive stage
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Stage {
            stage: "Archive",
            message: message.into(),
        }
    }

    /// Create a failure for the encryption stage
    pub fn encrypt(message: impl Into<String>) -> Self {
        Self::Stage {
            stage: "Encrypt",
            message: message.into(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an external stage failure
    pub fn is_stage(&self) -> bool {
        matches!(self, Self::Stage { .. })
    }

    /// Check if the run was stopped by a signal
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Check if this is a retention failure (the new artifact was already placed)
    pub fn is_retention(&self) -> bool {
        matches!(self, Self::Retention(_))
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for localbkup operations
pub type BackupResult<T> = Result<T, BackupError>;
