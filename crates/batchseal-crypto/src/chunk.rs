//! Per-chunk XChaCha20-Poly1305 encryption/decryption
//!
//! Encrypted chunk format (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//!
//! The nonce travels with the chunk, so a frame can be decrypted on its own
//! once it has been split at its boundary. A fresh nonce is drawn from the
//! thread-local CSPRNG on every call; nonces are never derived or reused.

use std::sync::Arc;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::error::CryptoError;
use crate::keys::SessionKey;
use crate::{FRAME_OVERHEAD, NONCE_SIZE};

/// Direction of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

impl Mode {
    /// Input bytes consumed per chunk for a given plaintext chunk size.
    ///
    /// Encryption reads plaintext chunks; decryption reads whole frames, each
    /// `FRAME_OVERHEAD` bytes longer than the plaintext that produced it.
    pub fn input_chunk_len(self, chunk_size: usize) -> usize {
        match self {
            Mode::Encrypt => chunk_size,
            Mode::Decrypt => chunk_size.saturating_add(FRAME_OVERHEAD),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Encrypt => f.write_str("encrypt"),
            Mode::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Encrypt a single chunk.
///
/// Returns: `[24-byte nonce][ciphertext][16-byte tag]`
pub fn encrypt_chunk(key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a single chunk frame produced by [`encrypt_chunk`].
pub fn decrypt_chunk(key: &SessionKey, encrypted: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if encrypted.len() < NONCE_SIZE {
        return Err(CryptoError::MalformedInput {
            len: encrypted.len(),
            min: NONCE_SIZE,
        });
    }

    let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailure)
}

/// Stateless chunk transform bound to one session key.
#[derive(Debug, Clone)]
pub struct ChunkCodec {
    key: Arc<SessionKey>,
}

impl ChunkCodec {
    pub fn new(key: Arc<SessionKey>) -> Self {
        Self { key }
    }

    pub fn transform(&self, chunk: &[u8], mode: Mode) -> Result<Vec<u8>, CryptoError> {
        match mode {
            Mode::Encrypt => encrypt_chunk(&self.key, chunk),
            Mode::Decrypt => decrypt_chunk(&self.key, chunk),
        }
    }
}
