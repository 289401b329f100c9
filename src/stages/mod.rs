//! External stages of a backup run
//!
//! The runner only knows two narrow contracts:
//!
//! - [`ArchiveStage`]: source paths + exclusion patterns -> one compressed file
//! - [`EncryptionStage`]: one file + passphrase -> one encrypted file whose
//!   suffix chain is the input's plus the encryption extension
//!
//! Both produce temp files allocated from the run's [`TempFileRegistry`].

mod gpg;
mod native;
mod shell;
mod tar;

use std::path::{Path, PathBuf};

use crate::backup::TempFileRegistry;
use crate::config::EncryptionMethod;
use crate::crypto::SecureString;
use crate::error::BackupResult;
use crate::logging::RunLog;

pub use gpg::GpgEncryptor;
pub use native::{NativeEncryptor, NATIVE_EXTENSION};
pub use shell::ShellRunner;
pub use tar::TarCompressor;

/// Produces a compressed archive of the sources
pub trait ArchiveStage {
    fn archive(
        &self,
        sources: &[String],
        excludes: &[String],
        temps: &mut TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<PathBuf>;
}

/// Produces an encrypted copy of a file
pub trait EncryptionStage {
    fn encrypt(
        &self,
        input: &Path,
        passphrase: &SecureString,
        temps: &mut TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<PathBuf>;
}

/// The encryption stage selected by the configuration
pub fn encryption_stage(method: EncryptionMethod) -> Box<dyn EncryptionStage> {
    match method {
        EncryptionMethod::Gpg => Box::new(GpgEncryptor::new()),
        EncryptionMethod::Native => Box::new(NativeEncryptor::new()),
    }
}
