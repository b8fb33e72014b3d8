//! Error types for key material and token signing

use thiserror::Error;

/// Result type alias using TokenError
pub type Result<T> = std::result::Result<T, TokenError>;

/// Errors that can occur while generating keys or signing tokens
#[derive(Error, Debug)]
pub enum TokenError {
    /// Key pair or key identifier could not be generated
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Key material could not be encoded for distribution
    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),

    /// Claim set could not be signed
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Token signature or structure did not verify
    #[error("Token verification failed: {0}")]
    Verification(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        TokenError::Serialization(err.to_string())
    }
}

impl From<p384::pkcs8::Error> for TokenError {
    fn from(err: p384::pkcs8::Error) -> Self {
        TokenError::KeyEncoding(err.to_string())
    }
}

impl From<p384::pkcs8::spki::Error> for TokenError {
    fn from(err: p384::pkcs8::spki::Error) -> Self {
        TokenError::KeyEncoding(err.to_string())
    }
}
