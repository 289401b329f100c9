//! Artifact naming
//!
//! Final artifacts are named `localbkup_<YYYYMMDDTHHMMSS><suffix chain>`.
//! The timestamp is fixed-width and zero-padded, so sorting names sorts
//! artifacts by creation time.

use std::path::{Path, PathBuf};

use crate::clock::Clock;
use crate::config::Configuration;

/// Prefix shared by every artifact; retention only touches names starting with it
pub const ARTIFACT_PREFIX: &str = "localbkup";

/// strftime pattern of the timestamp part
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Accumulated extension chain of a file name: `foo.tar.gz.gpg` -> `.tar.gz.gpg`.
///
/// Leading dots of the name are not extensions (`.bashrc` -> ``).
pub fn extract_suffix(path: impl AsRef<Path>) -> String {
    let name = match path.as_ref().file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return String::new(),
    };

    let mut stem = name.as_str();
    let mut suffix = String::new();
    loop {
        let leading = stem.len() - stem.trim_start_matches('.').len();
        match stem[leading..].rfind('.') {
            Some(i) => {
                let idx = leading + i;
                suffix.insert_str(0, &stem[idx..]);
                stem = &stem[..idx];
            }
            None => return suffix,
        }
    }
}

/// Derives destination paths from an injected clock
pub struct NamingPolicy<C: Clock> {
    clock: C,
}

impl<C: Clock> NamingPolicy<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// `<destination_folder>/localbkup_<timestamp><suffix>`
    pub fn generate_name(&self, config: &Configuration, suffix: &str) -> PathBuf {
        let file_name = format!(
            "{}_{}{}",
            ARTIFACT_PREFIX,
            self.clock.now().format(TIMESTAMP_FORMAT),
            suffix
        );
        config.destination_folder.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    #[test]
    fn test_generate_name() {
        let now = NaiveDate::from_ymd_opt(2020, 10, 12)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap();
        let config = Configuration::new("/destination", vec![], vec![], "", None);
        let naming = NamingPolicy::new(FixedClock(now));

        let result = naming.generate_name(&config, ".tar.gz");

        assert_eq!(
            result,
            PathBuf::from("/destination/localbkup_20201012T040506.tar.gz")
        );
    }

    #[test]
    fn test_names_sort_chronologically() {
        let config = Configuration::new("/d", vec![], vec![], "", None);
        let at = |h, m, s| {
            NamingPolicy::new(FixedClock(
                NaiveDate::from_ymd_opt(2021, 1, 9)
                    .unwrap()
                    .and_hms_opt(h, m, s)
                    .unwrap(),
            ))
            .generate_name(&config, ".tar.gz.gpg")
        };

        let earlier = at(9, 59, 59);
        let later = at(10, 0, 0);
        assert!(earlier < later);
    }

    #[test]
    fn test_extract_suffix_single() {
        assert_eq!(extract_suffix("foo.bar"), ".bar");
    }

    #[test]
    fn test_extract_suffix_none() {
        assert_eq!(extract_suffix("foo"), "");
    }

    #[test]
    fn test_extract_suffix_many() {
        assert_eq!(extract_suffix("foo.bar.baz"), ".bar.baz");
    }

    #[test]
    fn test_extract_suffix_ignores_directories() {
        assert_eq!(
            extract_suffix("/tmp/dir.d/localbkup-x1Yz.tar.gz.gpg"),
            ".tar.gz.gpg"
        );
        assert_eq!(extract_suffix("/home/me/.bashrc"), "");
    }
}
