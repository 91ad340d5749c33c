//! batchseal-crypto: per-chunk authenticated encryption for batchseal
//!
//! Cipher: XChaCha20-Poly1305 with a 256-bit session key.
//!
//! Encrypted chunk frame (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//!
//! Key lifecycle:
//! ```text
//! SessionKeyManager (one per engine instance, OS RNG, never exported)
//!   └── ChunkCodec: encrypt/decrypt one frame, fresh random nonce per call
//! ```

pub mod chunk;
pub mod error;
pub mod keys;

pub use chunk::{decrypt_chunk, encrypt_chunk, ChunkCodec, Mode};
pub use error::CryptoError;
pub use keys::{SessionKey, SessionKeyManager};

/// Size of a session key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Bytes added to every chunk by encryption: nonce prefix plus tag suffix.
pub const FRAME_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;
