use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use localbkup::cli::{handle_backup_command, BackupCommands};
use localbkup::config::{Configuration, LocalbkupPaths};
use localbkup::interrupt::InterruptFlag;
use localbkup::logging::{self, RunLog, TracingLog};

#[derive(Parser)]
#[command(
    name = "localbkup",
    version,
    about = "Makes a local backup of a list of files into a destination folder.",
    long_about = "localbkup archives the configured files with tar, encrypts the \
                  archive with a passphrase and stores it in the destination folder \
                  as localbkup_<timestamp>.tar.gz.gpg, keeping only the most recent \
                  keep_count backups."
)]
struct Cli {
    /// Configuration file. Defaults to $XDG_CONFIG_HOME/localbkup.json when
    /// XDG_CONFIG_HOME is set, ~/.config/localbkup.json otherwise
    #[arg(short, long, env = "LOCALBKUP_CONFIG")]
    config: Option<PathBuf>,

    /// A file where to log verbose output. Defaults to ~/.local/var/log/localbkup.log
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<BackupCommands>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(path) => path,
        None => LocalbkupPaths::new()?.log_file(),
    };
    logging::init(&log_file)?;

    let config_file = match cli.config {
        Some(path) => path,
        None => LocalbkupPaths::new()?.config_file(),
    };
    let config = Configuration::load(&config_file)
        .with_context(|| format!("Could not load {}", config_file.display()))?;

    let interrupt = InterruptFlag::install()?;

    let log = TracingLog;
    let command = cli.command.unwrap_or(BackupCommands::Run);
    // A failed run has already been logged by the runner
    let logged_by_runner = command == BackupCommands::Run;
    if let Err(e) = handle_backup_command(&config, command, &interrupt, &log) {
        if !logged_by_runner {
            log.error(&e.to_string());
        }
        return Err(e.into());
    }

    Ok(())
}
