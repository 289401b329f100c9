//! The backup pipeline
//!
//! `Archive -> Encrypt -> Name -> Place -> Retain`, strictly in that order.
//! The first failing step aborts the run. Temp files are released after the
//! last step or after the failure, before the result reaches the caller.
//! A raised [`InterruptFlag`] stops the run at the next stage boundary, and a
//! stage that failed because of the signal is reported as
//! [`BackupError::Interrupted`].

use std::fs;
use std::path::{Path, PathBuf};

use super::naming::{extract_suffix, NamingPolicy};
use super::retention::RetentionPolicy;
use super::temp::TempFileRegistry;
use crate::clock::Clock;
use crate::config::Configuration;
use crate::error::{BackupError, BackupResult};
use crate::interrupt::InterruptFlag;
use crate::logging::RunLog;
use crate::stages::{ArchiveStage, EncryptionStage};

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The artifact placed in the destination folder
    pub artifact: PathBuf,
    /// Old artifacts removed by retention, oldest first
    pub pruned: Vec<PathBuf>,
}

/// Sequences the stages of one backup run
pub struct Runner<C: Clock> {
    archiver: Box<dyn ArchiveStage>,
    encryptor: Box<dyn EncryptionStage>,
    naming: NamingPolicy<C>,
    interrupt: InterruptFlag,
}

impl<C: Clock> Runner<C> {
    pub fn new(
        archiver: Box<dyn ArchiveStage>,
        encryptor: Box<dyn EncryptionStage>,
        clock: C,
    ) -> Self {
        Self {
            archiver,
            encryptor,
            naming: NamingPolicy::new(clock),
            interrupt: InterruptFlag::new(),
        }
    }

    /// Stop between stages once `interrupt` is raised
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Run the pipeline with temp files in the system temp directory
    pub fn run(&self, config: &Configuration, log: &dyn RunLog) -> BackupResult<RunOutcome> {
        self.run_with(config, TempFileRegistry::new(), log)
    }

    /// Run the pipeline using `temps` for intermediate files.
    ///
    /// `temps` is drained before returning, whatever the outcome.
    pub fn run_with(
        &self,
        config: &Configuration,
        mut temps: TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<RunOutcome> {
        let result = self.execute(config, &mut temps, log).map_err(|e| {
            if self.interrupt.is_raised() {
                BackupError::Interrupted
            } else {
                e
            }
        });
        if let Err(e) = &result {
            log.error(&format!("Backup failed: {}", e));
        }
        temps.release_all(log);
        result
    }

    fn execute(
        &self,
        config: &Configuration,
        temps: &mut TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<RunOutcome> {
        self.interrupt.check()?;
        let compressed = self.archiver.archive(
            &config.source_files,
            &config.exclude_files,
            temps,
            log,
        )?;
        log.info(&format!("Compressed to file: {}", compressed.display()));

        self.interrupt.check()?;
        let encrypted = self
            .encryptor
            .encrypt(&compressed, &config.password, temps, log)?;
        log.info(&format!("Encrypted to file: {}", encrypted.display()));

        let artifact = self
            .naming
            .generate_name(config, &extract_suffix(&encrypted));

        self.interrupt.check()?;
        place(&encrypted, &artifact)?;
        log.info(&format!("Wrote final file {}", artifact.display()));

        self.interrupt.check()?;
        let pruned = RetentionPolicy::new(&config.destination_folder, config.keep_count)
            .apply(log)?;

        Ok(RunOutcome { artifact, pruned })
    }
}

/// Copy `source` to `target`, creating the target's parent directories
fn place(source: &Path, target: &Path) -> BackupResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            BackupError::Placement(format!(
                "Failed to create destination folder {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    fs::copy(source, target).map_err(|e| {
        BackupError::Placement(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            target.display(),
            e
        ))
    })?;

    Ok(())
}
