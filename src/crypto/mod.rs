//! Cryptographic functions for localbkup
//!
//! Provides AES-256-GCM encryption with Argon2id key derivation for the
//! `native` encryption stage, and the zeroizing passphrase holder.

pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;

pub use encryption::{decrypt_file, decrypt_stream, encrypt_file, encrypt_stream, EncryptionHeader};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecureString;
