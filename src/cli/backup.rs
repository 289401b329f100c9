//! Backup CLI commands
//!
//! Implements the `run`, `list`, `prune` and `decrypt` commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use crate::backup::{list_artifacts, RetentionPolicy, RunOutcome, Runner};
use crate::clock::SystemClock;
use crate::config::Configuration;
use crate::crypto::{decrypt_file, SecureString};
use crate::error::{BackupError, BackupResult};
use crate::interrupt::InterruptFlag;
use crate::logging::RunLog;
use crate::stages::{encryption_stage, TarCompressor};

/// Backup subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BackupCommands {
    /// Archive, encrypt and store the configured files (default)
    Run,

    /// List backups in the destination folder, oldest first
    List,

    /// Delete old backups according to `keep_count`
    Prune {
        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Decrypt a backup made with `"encryption": "native"`
    Decrypt {
        /// Encrypted backup file
        input: PathBuf,

        /// Where to write the decrypted archive
        #[arg(short, long)]
        output: PathBuf,

        /// Ask for the passphrase instead of using the configured one
        #[arg(long)]
        prompt: bool,
    },
}

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Backup")]
    filename: String,
    #[tabled(rename = "Size")]
    size: String,
}

/// Handle a backup command
pub fn handle_backup_command(
    config: &Configuration,
    cmd: BackupCommands,
    interrupt: &InterruptFlag,
    log: &dyn RunLog,
) -> BackupResult<()> {
    match cmd {
        BackupCommands::Run => {
            let outcome = run_backup(config, interrupt, log)?;
            println!("Backup created: {}", outcome.artifact.display());
            if !outcome.pruned.is_empty() {
                println!("Removed {} old backup(s)", outcome.pruned.len());
            }
        }

        BackupCommands::List => {
            let artifacts = list_artifacts(&config.destination_folder)?;

            if artifacts.is_empty() {
                println!(
                    "No backups found in {}",
                    config.destination_folder.display()
                );
                return Ok(());
            }

            let rows: Vec<ArtifactRow> = artifacts
                .into_iter()
                .enumerate()
                .map(|(i, a)| ArtifactRow {
                    index: i + 1,
                    filename: a.filename,
                    size: a.size_bytes.map(format_size).unwrap_or_else(|| "?".into()),
                })
                .collect();
            let total = rows.len();

            let mut table = Table::new(rows);
            table.with(Style::psql());
            println!("{}", table);
            println!();
            println!("Total: {} backup(s)", total);
            match config.keep_count {
                Some(n) => println!("Retention: keep {} most recent", n),
                None => println!("Retention: keep all"),
            }
        }

        BackupCommands::Prune { dry_run } => {
            let policy = RetentionPolicy::new(&config.destination_folder, config.keep_count);

            let Some(keep_count) = policy.keep_count() else {
                println!("No keep_count configured; all backups are kept.");
                return Ok(());
            };

            if dry_run {
                let planned = policy.plan()?;
                if planned.is_empty() {
                    println!("No backups to prune (keeping {}).", keep_count);
                } else {
                    println!("Would delete {} backup(s):", planned.len());
                    for artifact in planned {
                        println!("  {}", artifact.filename);
                    }
                }
                return Ok(());
            }

            let deleted = policy.apply(log)?;
            if deleted.is_empty() {
                println!("No backups to prune (keeping {}).", keep_count);
            } else {
                println!("Deleted {} backup(s).", deleted.len());
            }
        }

        BackupCommands::Decrypt {
            input,
            output,
            prompt,
        } => {
            let passphrase = if prompt {
                prompt_passphrase("Backup passphrase: ")?
            } else {
                config.password.clone()
            };

            decrypt_to(&input, &output, &passphrase)?;
            log.info(&format!(
                "Decrypted {} to {}",
                input.display(),
                output.display()
            ));
            println!("Decrypted to {}", output.display());
        }
    }

    Ok(())
}

/// Run the full pipeline with the real stages
pub fn run_backup(
    config: &Configuration,
    interrupt: &InterruptFlag,
    log: &dyn RunLog,
) -> BackupResult<RunOutcome> {
    log.info(&format!("Starting backup with {:?}", config));
    let runner = Runner::new(
        Box::new(TarCompressor::new()),
        encryption_stage(config.encryption),
        SystemClock,
    )
    .with_interrupt(interrupt.clone());
    runner.run(config, log)
}

fn decrypt_to(input: &Path, output: &Path, passphrase: &SecureString) -> BackupResult<()> {
    if output.exists() {
        return Err(BackupError::Io(format!(
            "Refusing to overwrite {}",
            output.display()
        )));
    }
    decrypt_file(input, output, passphrase)
}

/// Prompt for a passphrase (hidden input)
fn prompt_passphrase(prompt: &str) -> BackupResult<SecureString> {
    rpassword::prompt_password(prompt)
        .map(SecureString::from)
        .map_err(|e| BackupError::Encryption(format!("Failed to read passphrase: {}", e)))
}

/// Format a byte count in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encrypt_file, KeyDerivationParams};
    use crate::logging::RecordingLog;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_prune_dry_run_deletes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("localbkup_20201012T040506"), b"x").unwrap();
        fs::write(dir.path().join("localbkup_20201012T040507"), b"x").unwrap();
        let config = Configuration::new(dir.path(), vec![], vec![], "pw", Some(1));
        let never = InterruptFlag::new();
        let log = RecordingLog::new();

        handle_backup_command(&config, BackupCommands::Prune { dry_run: true }, &never, &log)
            .unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);

        handle_backup_command(&config, BackupCommands::Prune { dry_run: false }, &never, &log)
            .unwrap();
        assert!(!dir.path().join("localbkup_20201012T040506").exists());
        assert!(dir.path().join("localbkup_20201012T040507").exists());
    }

    #[test]
    fn test_decrypt_with_configured_passphrase() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("a.tar.gz");
        let enc = dir.path().join("localbkup_20201012T040506.tar.gz.enc");
        let out = dir.path().join("restored.tar.gz");
        fs::write(&plain, b"payload").unwrap();
        encrypt_file(&plain, &enc, "pw", KeyDerivationParams::fast()).unwrap();

        let config = Configuration::new(dir.path(), vec![], vec![], "pw", None);
        let never = InterruptFlag::new();
        let log = RecordingLog::new();
        let cmd = BackupCommands::Decrypt {
            input: enc.clone(),
            output: out.clone(),
            prompt: false,
        };
        handle_backup_command(&config, cmd.clone(), &never, &log).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"payload");

        // Existing output is never overwritten
        assert!(handle_backup_command(&config, cmd, &never, &log).is_err());
    }
}
