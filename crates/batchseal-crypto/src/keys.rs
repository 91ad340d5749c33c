//! Ephemeral session keys: one per engine instance, never persisted or exported

use std::sync::Arc;

use rand::{rngs::OsRng, CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::KEY_SIZE;

/// A 256-bit XChaCha20-Poly1305 session key. Zeroized on drop.
///
/// Deliberately neither `Clone` nor serializable: the only way to share it is
/// through the `Arc` handed out by [`SessionKeyManager::key`].
pub struct SessionKey {
    bytes: [u8; KEY_SIZE],
}

impl SessionKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Owns the session key for one engine instance.
#[derive(Debug, Clone)]
pub struct SessionKeyManager {
    key: Arc<SessionKey>,
}

impl SessionKeyManager {
    /// Generate a fresh session key from the operating system RNG.
    pub fn new() -> Result<Self, CryptoError> {
        Self::from_rng(&mut OsRng)
    }

    /// Generate a session key from a caller-supplied CSPRNG.
    ///
    /// An RNG failure is fatal: no manager is returned and the caller has to
    /// build a new one.
    pub fn from_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_SIZE];
        if let Err(e) = rng.try_fill_bytes(&mut bytes) {
            bytes.zeroize();
            tracing::error!(error = %e, "secure random source unavailable");
            return Err(CryptoError::KeyInitialization(e.to_string()));
        }
        tracing::debug!("session key generated");
        Ok(Self {
            key: Arc::new(SessionKey { bytes }),
        })
    }

    /// Shared handle to the session key.
    pub fn key(&self) -> Arc<SessionKey> {
        Arc::clone(&self.key)
    }
}
