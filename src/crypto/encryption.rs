//! Chunked AES-256-GCM encryption of archives
//!
//! Encrypted file layout:
//!
//! ```text
//! LOCALBKUP-ENC1\n
//! {"kdf": {...argon2 params...}, "nonce": "<base64>", "chunk_size": N}\n
//! <chunk 0: N bytes + tag> <chunk 1> ... <last chunk: < N bytes + tag>
//! ```
//!
//! Chunks are sealed with the STREAM construction (big-endian 32-bit
//! counter plus a last-chunk flag in the nonce). Reordered, dropped or
//! truncated chunks fail authentication. Only one chunk is held in memory
//! at a time, whatever the archive size.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::stream::{DecryptorBE32, EncryptorBE32};
use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{BackupError, BackupResult};

use super::{derive_key, DerivedKey, KeyDerivationParams};

/// First line of every natively encrypted artifact
pub const MAGIC: &[u8] = b"LOCALBKUP-ENC1\n";

/// Plaintext bytes per chunk
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Largest chunk size accepted from a header
const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// GCM nonce (12 bytes) minus the 5 bytes STREAM uses for counter and flag
const STREAM_NONCE_SIZE: usize = 7;

/// GCM authentication tag
const TAG_SIZE: usize = 16;

/// Upper bound for the JSON header line
const MAX_HEADER_LEN: u64 = 4096;

/// Metadata stored in front of the ciphertext
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionHeader {
    /// Parameters needed to re-derive the key
    pub kdf: KeyDerivationParams,
    /// STREAM nonce prefix (base64)
    pub nonce: String,
    /// Plaintext bytes per chunk
    pub chunk_size: usize,
}

impl EncryptionHeader {
    fn decode_nonce(&self) -> BackupResult<[u8; STREAM_NONCE_SIZE]> {
        let nonce = STANDARD
            .decode(&self.nonce)
            .map_err(|e| BackupError::Encryption(format!("Invalid nonce encoding: {}", e)))?;
        nonce.as_slice().try_into().map_err(|_| {
            BackupError::Encryption(format!(
                "Invalid nonce size: expected {}, got {}",
                STREAM_NONCE_SIZE,
                nonce.len()
            ))
        })
    }
}

fn cipher(key: &DerivedKey) -> BackupResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| BackupError::Encryption(format!("Failed to create cipher: {}", e)))
}

/// Read until `buf` is full or the input ends; returns the bytes read
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Encrypt everything `reader` yields into `writer`
pub fn encrypt_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    passphrase: &str,
    kdf: KeyDerivationParams,
) -> BackupResult<()> {
    encrypt_chunked(reader, writer, passphrase, kdf, CHUNK_SIZE)
}

fn encrypt_chunked<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    passphrase: &str,
    kdf: KeyDerivationParams,
    chunk_size: usize,
) -> BackupResult<()> {
    let key = derive_key(passphrase, &kdf)?;

    let mut nonce = [0u8; STREAM_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let header = EncryptionHeader {
        kdf,
        nonce: STANDARD.encode(nonce),
        chunk_size,
    };
    writer.write_all(MAGIC)?;
    serde_json::to_writer(&mut writer, &header)?;
    writer.write_all(b"\n")?;

    let mut encryptor =
        EncryptorBE32::<Aes256Gcm>::from_aead(cipher(&key)?, GenericArray::from_slice(&nonce));
    let sealing_failed = |_| BackupError::Encryption("Encryption failed".to_string());

    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = read_chunk(&mut reader, &mut buf)?;
        if n == chunk_size {
            let sealed = encryptor.encrypt_next(&buf[..]).map_err(sealing_failed)?;
            writer.write_all(&sealed)?;
        } else {
            let sealed = encryptor.encrypt_last(&buf[..n]).map_err(sealing_failed)?;
            writer.write_all(&sealed)?;
            break;
        }
    }
    buf.zeroize();

    writer.flush()?;
    Ok(())
}

/// Decrypt data produced by [`encrypt_stream`] into `writer`.
///
/// Plaintext of authenticated chunks is written as it is verified, so a
/// failure can leave a partial prefix in `writer`.
pub fn decrypt_stream<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    passphrase: &str,
) -> BackupResult<()> {
    let mut magic = [0u8; MAGIC.len()];
    if read_chunk(&mut reader, &mut magic)? != MAGIC.len() || magic != MAGIC {
        return Err(BackupError::Encryption(
            "Not a localbkup encrypted file".to_string(),
        ));
    }

    let mut line = Vec::new();
    (&mut reader)
        .take(MAX_HEADER_LEN)
        .read_until(b'\n', &mut line)?;
    if line.pop() != Some(b'\n') {
        return Err(BackupError::Encryption(
            "Truncated encryption header".to_string(),
        ));
    }
    let header: EncryptionHeader = serde_json::from_slice(&line)
        .map_err(|e| BackupError::Encryption(format!("Invalid encryption header: {}", e)))?;
    if header.chunk_size == 0 || header.chunk_size > MAX_CHUNK_SIZE {
        return Err(BackupError::Encryption(format!(
            "Invalid chunk size: {}",
            header.chunk_size
        )));
    }

    let nonce = header.decode_nonce()?;
    let key = derive_key(passphrase, &header.kdf)?;
    let mut decryptor =
        DecryptorBE32::<Aes256Gcm>::from_aead(cipher(&key)?, GenericArray::from_slice(&nonce));
    let opening_failed = |_| {
        BackupError::Encryption(
            "Decryption failed: invalid passphrase or corrupted data".to_string(),
        )
    };

    let mut buf = vec![0u8; header.chunk_size + TAG_SIZE];
    loop {
        let n = read_chunk(&mut reader, &mut buf)?;
        if n == buf.len() {
            let mut plain = decryptor.decrypt_next(&buf[..]).map_err(opening_failed)?;
            writer.write_all(&plain)?;
            plain.zeroize();
        } else {
            let mut plain = decryptor.decrypt_last(&buf[..n]).map_err(opening_failed)?;
            writer.write_all(&plain)?;
            plain.zeroize();
            break;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Encrypt the file at `input` into `output`
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    passphrase: &str,
    kdf: KeyDerivationParams,
) -> BackupResult<()> {
    let reader = File::open(input).map_err(|e| {
        BackupError::Io(format!("Failed to read {}: {}", input.display(), e))
    })?;
    let writer = File::create(output).map_err(|e| {
        BackupError::Io(format!("Failed to write {}: {}", output.display(), e))
    })?;
    encrypt_stream(reader, BufWriter::new(writer), passphrase, kdf)
}

/// Decrypt the file at `input` into `output`; `output` is removed on failure
pub fn decrypt_file(input: &Path, output: &Path, passphrase: &str) -> BackupResult<()> {
    let reader = File::open(input).map_err(|e| {
        BackupError::Io(format!("Failed to read {}: {}", input.display(), e))
    })?;
    let writer = File::create(output).map_err(|e| {
        BackupError::Io(format!("Failed to write {}: {}", output.display(), e))
    })?;

    let result = decrypt_stream(BufReader::new(reader), BufWriter::new(writer), passphrase);
    if result.is_err() {
        let _ = fs::remove_file(output);
    }
    result
}
