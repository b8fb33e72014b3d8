//! Signing keys and JWT signing
//!
//! Tokens are compact JWS (RFC 7515) signed with ECDSA over NIST P-384
//! (`ES384`). The key pair is generated in memory, never persisted, and
//! tagged with a random 128-bit key identifier.
//!
//! Key types:
//! - `KeyPair`: private signing key plus its public view
//! - `PublicKeyView`: public key material pre-rendered as JWK and PEM
//! - `SignedToken`: a compact serialized JWT

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p384::elliptic_curve::sec1::ToEncodedPoint;
use p384::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use p384::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::claims::ClaimSet;
use crate::error::{Result, TokenError};
use crate::jwk::{Jwk, JwkSet, CRV_P384, KTY_EC, USE_SIG};
use crate::media::KeyFormat;

/// Signature algorithm matched to the P-384 curve
pub const ALGORITHM: Algorithm = Algorithm::ES384;

/// Number of random bytes in a generated key identifier
pub const KID_BYTES: usize = 16;

/// A compact serialized JWT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    /// Get the compact serialization
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the compact serialization
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// P-384 key pair for signing tokens
#[derive(Clone)]
pub struct KeyPair {
    /// ES384 encoding key (private)
    encoding_key: EncodingKey,
    /// Public projection, including the key identifier
    public: PublicKeyView,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.public.kid)
            .field("encoding_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair with a random key identifier
    pub fn generate() -> Result<Self> {
        let mut kid = [0u8; KID_BYTES];
        OsRng
            .try_fill_bytes(&mut kid)
            .map_err(|e| TokenError::KeyGeneration(format!("key identifier: {}", e)))?;

        let secret = SecretKey::random(&mut OsRng);
        let key_pair = Self::from_secret_key(URL_SAFE_NO_PAD.encode(kid), &secret)?;

        debug!(kid = %key_pair.kid(), alg = ?ALGORITHM, "Generated P-384 signing key");
        Ok(key_pair)
    }

    /// Create a key pair from an existing P-384 secret key
    pub fn from_secret_key(kid: impl Into<String>, secret: &SecretKey) -> Result<Self> {
        let pkcs8 = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| TokenError::KeyGeneration(format!("PKCS#8 encoding: {}", e)))?;

        let encoding_key = EncodingKey::from_ec_pem(pkcs8.as_bytes())
            .map_err(|e| TokenError::KeyGeneration(format!("signing key: {}", e)))?;

        let public = PublicKeyView::new(kid, &secret.public_key())?;

        Ok(Self {
            encoding_key,
            public,
        })
    }

    /// Get the key identifier
    pub fn kid(&self) -> &str {
        self.public.kid()
    }

    /// Get the public view of this key pair
    pub fn public_key(&self) -> &PublicKeyView {
        &self.public
    }

    /// Sign a claim set as an ES384 JWT carrying this key's `kid`
    pub fn sign(&self, claims: &ClaimSet) -> Result<SignedToken> {
        let mut header = Header::new(ALGORITHM);
        header.kid = Some(self.kid().to_string());

        jsonwebtoken::encode(&header, claims, &self.encoding_key)
            .map(SignedToken)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

/// Public half of a [`KeyPair`]
///
/// All representations are rendered once at construction, so serving them
/// per request never touches the private key.
#[derive(Clone)]
pub struct PublicKeyView {
    kid: String,
    jwk: Jwk,
    pem: String,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for PublicKeyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyView")
            .field("kid", &self.kid)
            .field("jwk", &self.jwk)
            .finish()
    }
}

impl PublicKeyView {
    /// Derive the public view of a P-384 public key
    pub fn new(kid: impl Into<String>, key: &PublicKey) -> Result<Self> {
        let kid = kid.into();

        let point = key.to_encoded_point(false);
        let (x, y) = match (point.x(), point.y()) {
            (Some(x), Some(y)) => (URL_SAFE_NO_PAD.encode(x), URL_SAFE_NO_PAD.encode(y)),
            _ => {
                return Err(TokenError::KeyEncoding(
                    "public key has no affine coordinates".into(),
                ))
            }
        };

        let pem = key.to_public_key_pem(LineEnding::LF)?;

        let decoding_key = DecodingKey::from_ec_components(&x, &y)
            .map_err(|e| TokenError::KeyEncoding(e.to_string()))?;

        let jwk = Jwk {
            kty: KTY_EC.into(),
            crv: CRV_P384.into(),
            x,
            y,
            kid: kid.clone(),
            key_use: USE_SIG.into(),
            alg: "ES384".into(),
        };

        Ok(Self {
            kid,
            jwk,
            pem,
            decoding_key,
        })
    }

    /// Get the key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Get the JWK representation
    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    /// Get the SPKI PEM representation
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// A key set containing exactly this key
    pub fn jwk_set(&self) -> JwkSet {
        JwkSet::new().with(self.jwk.clone())
    }

    /// Serialize this key in the requested format
    pub fn render(&self, format: KeyFormat) -> Result<Vec<u8>> {
        match format {
            KeyFormat::Jwk => Ok(serde_json::to_vec(&self.jwk)?),
            KeyFormat::JwkSet => Ok(serde_json::to_vec(&self.jwk_set())?),
            KeyFormat::Pem => Ok(self.pem.clone().into_bytes()),
        }
    }

    /// Verify a token signed by the matching private key
    ///
    /// The token's `kid` header, when present, must name this key.
    pub fn verify(&self, token: &str) -> Result<ClaimSet> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::Verification(e.to_string()))?;

        if let Some(kid) = header.kid.as_deref() {
            if kid != self.kid {
                return Err(TokenError::Verification(format!(
                    "Key ID mismatch: expected '{}', got '{}'",
                    self.kid, kid
                )));
            }
        }

        verify(token, &self.decoding_key)
    }
}

/// Verify an ES384 token against any decoding key and return its claims
///
/// No claims are required; `exp` and `nbf` are checked when present.
pub fn verify(token: &str, key: &DecodingKey) -> Result<ClaimSet> {
    let mut validation = Validation::new(ALGORITHM);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;

    jsonwebtoken::decode::<ClaimSet>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Verification(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keypair_generation() {
        let kp = KeyPair::generate().unwrap();

        // 16 bytes, base64url without padding
        assert_eq!(kp.kid().len(), 22);
        assert!(!kp.kid().contains('='));
        assert_eq!(kp.public_key().kid(), kp.kid());
    }

    #[test]
    fn test_generated_kids_differ() {
        let kp1 = KeyPair::generate().unwrap();
        let kp2 = KeyPair::generate().unwrap();
        assert_ne!(kp1.kid(), kp2.kid());
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate().unwrap();
        let claims = ClaimSet::new().with("role", "admin").with("iat", 1_700_000_000);

        let token = kp.sign(&claims).unwrap();
        assert_eq!(token.as_str().split('.').count(), 3);

        let verified = kp.public_key().verify(token.as_str()).unwrap();
        assert_eq!(verified, claims);
    }

    #[test]
    fn test_header_carries_kid_and_alg() {
        let kp = KeyPair::generate().unwrap();
        let token = kp.sign(&ClaimSet::new()).unwrap();

        let header = jsonwebtoken::decode_header(token.as_str()).unwrap();
        assert_eq!(header.alg, Algorithm::ES384);
        assert_eq!(header.kid.as_deref(), Some(kp.kid()));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_verification_fails_with_wrong_key() {
        let kp1 = KeyPair::generate().unwrap();
        let kp2 = KeyPair::generate().unwrap();

        let token = kp1.sign(&ClaimSet::new().with("a", 1)).unwrap();

        assert!(kp2.public_key().verify(token.as_str()).is_err());
    }

    #[test]
    fn test_pem_and_jwk_both_verify() {
        let kp = KeyPair::generate().unwrap();
        let token = kp.sign(&ClaimSet::new().with("scope", json!(["read"]))).unwrap();
        let view = kp.public_key();

        let from_pem = DecodingKey::from_ec_pem(view.pem().as_bytes()).unwrap();
        let from_jwk = DecodingKey::from_ec_components(&view.jwk().x, &view.jwk().y).unwrap();

        assert_eq!(verify(token.as_str(), &from_pem).unwrap().get("scope"), Some(&json!(["read"])));
        assert_eq!(verify(token.as_str(), &from_jwk).unwrap().get("scope"), Some(&json!(["read"])));
    }

    #[test]
    fn test_expired_token_rejected() {
        let kp = KeyPair::generate().unwrap();
        let token = kp.sign(&ClaimSet::new().with("iat", 1).with("exp", 2)).unwrap();

        assert!(kp.public_key().verify(token.as_str()).is_err());
    }

    #[test]
    fn test_render_formats() {
        let kp = KeyPair::generate().unwrap();
        let view = kp.public_key();

        let jwk: Jwk = serde_json::from_slice(&view.render(KeyFormat::Jwk).unwrap()).unwrap();
        assert_eq!(&jwk, view.jwk());
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv, "P-384");
        assert_eq!(jwk.alg, "ES384");

        let set: JwkSet = serde_json::from_slice(&view.render(KeyFormat::JwkSet).unwrap()).unwrap();
        assert_eq!(set.keys, vec![jwk]);

        let pem = String::from_utf8(view.render(KeyFormat::Pem).unwrap()).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let kp = KeyPair::generate().unwrap();
        let debug = format!("{:?}", kp);
        assert!(debug.contains("[redacted]"));
        assert!(debug.contains(kp.kid()));
    }
}
