//! localbkup - local encrypted backups
//!
//! Archives a configured list of files, encrypts the archive with a
//! passphrase, stores it in a destination folder under a timestamped name and
//! prunes old backups beyond a retention count.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Default paths and the JSON configuration
//! - `error`: Custom error types
//! - `logging`: Injected log sink and subscriber setup
//! - `clock`: Injected time source
//! - `interrupt`: SIGINT/SIGTERM handling during a run
//! - `crypto`: Argon2id + AES-256-GCM for the native encryption stage
//! - `stages`: Archive and encryption stages (tar, gpg, native)
//! - `backup`: Temp files, naming, retention and the pipeline runner
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use localbkup::config::Configuration;
//! use localbkup::interrupt::InterruptFlag;
//! use localbkup::logging::TracingLog;
//!
//! let config = Configuration::load(path)?;
//! let interrupt = InterruptFlag::install()?;
//! let outcome = localbkup::cli::run_backup(&config, &interrupt, &TracingLog)?;
//! ```

pub mod backup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod stages;

pub use error::{BackupError, BackupResult};
