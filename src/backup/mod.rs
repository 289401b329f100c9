//! Backup pipeline for localbkup
//!
//! # Architecture
//!
//! - `TempFileRegistry`: owns every intermediate file of a run
//! - `NamingPolicy`: `localbkup_<YYYYMMDDTHHMMSS><suffix chain>` destination names
//! - `RetentionPolicy`: keeps the N most recent artifacts, by name
//! - `Runner`: archive, encrypt, name, place, retain
//!
//! # Example
//!
//! ```rust,ignore
//! use localbkup::backup::Runner;
//! use localbkup::clock::SystemClock;
//! use localbkup::logging::TracingLog;
//! use localbkup::stages::{encryption_stage, TarCompressor};
//!
//! let runner = Runner::new(
//!     Box::new(TarCompressor::new()),
//!     encryption_stage(config.encryption),
//!     SystemClock,
//! );
//! let outcome = runner.run(&config, &TracingLog)?;
//! println!("{}", outcome.artifact.display());
//! ```

mod naming;
mod retention;
mod runner;
mod temp;

pub use naming::{extract_suffix, NamingPolicy, ARTIFACT_PREFIX, TIMESTAMP_FORMAT};
pub use retention::{list_artifacts, ArtifactInfo, RetentionPolicy};
pub use runner::{RunOutcome, Runner};
pub use temp::{ManagedTempFile, TempFileRegistry};
