//! Key Manager for the token service
//!
//! Owns the one signing key pair of this process. The key is generated at
//! startup, never persisted and never replaced; every issued token is signed
//! by it and every served public key is derived from it.

use claimy_core::{ClaimSet, JwkSet, KeyFormat, KeyPair, PublicKeyView, SignedToken, TokenError};
use tracing::info;

/// A rendered public key, ready to be written as a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Canonical media type of `body`
    pub media_type: &'static str,
    /// Encoded key material
    pub body: Vec<u8>,
}

/// Holder of the process signing key
#[derive(Debug)]
pub struct KeyManager {
    key_pair: KeyPair,
}

impl KeyManager {
    /// Wrap an existing key pair
    pub fn new(key_pair: KeyPair) -> Self {
        info!(kid = %key_pair.kid(), "Key manager initialized with signing key");
        Self { key_pair }
    }

    /// Generate a fresh P-384 key pair with a random key ID
    pub fn generate() -> Result<Self, TokenError> {
        Ok(Self::new(KeyPair::generate()?))
    }

    /// Get the signing key ID
    pub fn kid(&self) -> &str {
        self.key_pair.kid()
    }

    /// Get the public half of the signing key
    pub fn public_view(&self) -> &PublicKeyView {
        self.key_pair.public_key()
    }

    /// The key set served to verifiers; always exactly one key
    pub fn jwk_set(&self) -> JwkSet {
        self.public_view().jwk_set()
    }

    /// Render the public key in `format`
    pub fn render(&self, format: KeyFormat) -> Result<Rendered, TokenError> {
        Ok(Rendered {
            media_type: format.media_type(),
            body: self.public_view().render(format)?,
        })
    }

    /// Sign a claim set with the process key
    pub fn sign(&self, claims: &ClaimSet) -> Result<SignedToken, TokenError> {
        self.key_pair.sign(claims)
    }
}
