//! Stretching the backup passphrase into an AES-256 key
//!
//! Every native artifact carries its own [`KeyDerivationParams`] in the
//! header: a random salt plus the Argon2id costs it was sealed with. Costs
//! can therefore be raised later without breaking old backups.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BackupError, BackupResult};

/// Length of the derived key (AES-256)
pub const KEY_LEN: usize = 32;

/// Random salt drawn for each artifact
const SALT_LEN: usize = 16;

/// 64 MiB
const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
const DEFAULT_PASSES: u32 = 3;
const DEFAULT_LANES: u32 = 4;

/// Argon2id inputs recorded in an artifact header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Base64 of the raw salt bytes; empty until [`with_fresh_salt`](Self::with_fresh_salt)
    pub salt: String,
    /// KiB of memory
    pub memory_cost: u32,
    /// Passes over memory
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            salt: String::new(),
            memory_cost: DEFAULT_MEMORY_KIB,
            time_cost: DEFAULT_PASSES,
            parallelism: DEFAULT_LANES,
        }
    }
}

impl KeyDerivationParams {
    /// Same costs, new random salt
    pub fn with_fresh_salt(&self) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self {
            salt: STANDARD.encode(salt),
            ..self.clone()
        }
    }

    fn salt_bytes(&self) -> BackupResult<Vec<u8>> {
        let salt = STANDARD
            .decode(&self.salt)
            .map_err(|e| BackupError::Encryption(format!("Invalid salt encoding: {}", e)))?;
        if salt.len() < argon2::MIN_SALT_LEN {
            return Err(BackupError::Encryption(format!(
                "Salt too short: {} bytes",
                salt.len()
            )));
        }
        Ok(salt)
    }

    /// Cheapest costs Argon2 accepts, with a fresh salt
    #[cfg(test)]
    pub(crate) fn fast() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
            ..Self::default()
        }
        .with_fresh_salt()
    }
}

/// A derived key, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Derive the artifact key for `passphrase` under `params`
pub fn derive_key(passphrase: &str, params: &KeyDerivationParams) -> BackupResult<DerivedKey> {
    let salt = params.salt_bytes()?;
    let cost = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| BackupError::Encryption(format!("Invalid Argon2 parameters: {}", e)))?;

    let mut key = DerivedKey([0u8; KEY_LEN]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, cost)
        .hash_password_into(passphrase.as_bytes(), &salt, &mut key.0)
        .map_err(|e| BackupError::Encryption(format!("Key derivation failed: {}", e)))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_reproducible_from_header_params() {
        let params = KeyDerivationParams::fast();
        let key1 = derive_key("correct horse", &params).unwrap();
        let key2 = derive_key("correct horse", &params).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_passphrase_changes_key() {
        let params = KeyDerivationParams::fast();
        let key1 = derive_key("passphrase1", &params).unwrap();
        let key2 = derive_key("passphrase2", &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_fresh_salt_keeps_costs() {
        let base = KeyDerivationParams::fast();
        let salted = base.with_fresh_salt();

        assert_ne!(base.salt, salted.salt);
        assert_eq!(base.memory_cost, salted.memory_cost);
        assert_ne!(
            derive_key("same", &base).unwrap().as_bytes(),
            derive_key("same", &salted).unwrap().as_bytes()
        );
    }

    #[test]
    fn test_unsalted_params_are_rejected() {
        // Default params carry no salt until one is drawn
        assert!(derive_key("x", &KeyDerivationParams::default()).is_err());

        let garbage = KeyDerivationParams {
            salt: "!".into(),
            ..KeyDerivationParams::fast()
        };
        assert!(derive_key("x", &garbage).is_err());
    }
}
