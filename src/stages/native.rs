//! In-process encryption stage (Argon2id + AES-256-GCM)

use std::path::{Path, PathBuf};

use super::EncryptionStage;
use crate::backup::{extract_suffix, TempFileRegistry};
use crate::crypto::{encrypt_file, KeyDerivationParams, SecureString};
use crate::error::{BackupError, BackupResult};
use crate::logging::RunLog;

/// Suffix appended by the native stage
pub const NATIVE_EXTENSION: &str = ".enc";

/// Encrypts without external tools; a fresh salt is drawn for every artifact
#[derive(Debug, Clone, Default)]
pub struct NativeEncryptor {
    /// Cost parameters; the salt field is ignored
    params: KeyDerivationParams,
}

impl NativeEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom Argon2 cost parameters
    pub fn with_params(params: KeyDerivationParams) -> Self {
        Self { params }
    }
}

impl EncryptionStage for NativeEncryptor {
    fn encrypt(
        &self,
        input: &Path,
        passphrase: &SecureString,
        temps: &mut TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<PathBuf> {
        let output = temps.allocate(&format!("{}{}", extract_suffix(input), NATIVE_EXTENSION))?;

        let params = self.params.with_fresh_salt();
        log.info(&format!(
            "Encrypting {} with chunked AES-256-GCM (argon2id m={} t={} p={})",
            input.display(),
            params.memory_cost,
            params.time_cost,
            params.parallelism
        ));

        encrypt_file(input, output.path(), passphrase, params)
            .map_err(|e| BackupError::encrypt(e.to_string()))?;

        Ok(output.into_path())
    }
}
