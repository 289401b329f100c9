//! CLI command handlers
//!
//! Bridges the clap argument parsing with the backup pipeline.

pub mod backup;

pub use backup::{handle_backup_command, run_backup, BackupCommands};
