//! Configuration module for localbkup
//!
//! This module provides:
//! - Default config/log file locations
//! - Loading and validating the JSON backup configuration

pub mod paths;
pub mod settings;

pub use paths::LocalbkupPaths;
pub use settings::{Configuration, EncryptionMethod};
