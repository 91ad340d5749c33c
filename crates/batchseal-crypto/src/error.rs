use thiserror::Error;

/// Failures raised by the chunk codec and the session key manager.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Decrypt input too short to even hold a nonce.
    #[error("malformed chunk: {len} bytes (minimum {min})")]
    MalformedInput { len: usize, min: usize },

    /// Tag did not verify: tampered data or a key from another session.
    #[error("chunk authentication failed: wrong key or corrupted data")]
    AuthenticationFailure,

    #[error("chunk encryption failed: {0}")]
    Encryption(String),

    #[error("session key initialization failed: {0}")]
    KeyInitialization(String),
}

impl CryptoError {
    /// True for failures that indicate the input itself is bad (as opposed to
    /// a local encryption fault).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CryptoError::MalformedInput { .. } | CryptoError::AuthenticationFailure
        )
    }
}
