//! Encryption stage backed by `gpg --symmetric`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{EncryptionStage, ShellRunner};
use crate::backup::{extract_suffix, TempFileRegistry};
use crate::crypto::SecureString;
use crate::error::{BackupError, BackupResult};
use crate::logging::RunLog;

/// Symmetric gpg encryption, passphrase fed on stdin
#[derive(Debug, Clone)]
pub struct GpgEncryptor {
    program: OsString,
    runner: ShellRunner,
}

impl Default for GpgEncryptor {
    fn default() -> Self {
        Self::with_program("gpg")
    }
}

impl GpgEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            runner: ShellRunner::new("Encrypt"),
        }
    }

    pub fn gpg_args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.program.clone()];
        args.extend(
            [
                "--batch",
                "--yes",
                "--passphrase-fd",
                "0",
                "--symmetric",
                "-o",
                "-",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(input.as_os_str().to_os_string());
        args
    }
}

impl EncryptionStage for GpgEncryptor {
    fn encrypt(
        &self,
        input: &Path,
        passphrase: &SecureString,
        temps: &mut TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<PathBuf> {
        let output = temps.allocate(&format!("{}.gpg", extract_suffix(input)))?;
        let stdout = output.open_write().map_err(|e| {
            BackupError::encrypt(format!(
                "Failed to open {}: {}",
                output.path().display(),
                e
            ))
        })?;

        self.runner
            .run(&self.gpg_args(input), Some(passphrase.as_str()), Some(stdout), log)?;

        Ok(output.into_path())
    }
}
