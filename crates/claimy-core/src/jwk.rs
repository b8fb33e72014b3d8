//! JSON Web Key representations (RFC 7517)

use serde::{Deserialize, Serialize};

/// Key type for elliptic-curve keys
pub const KTY_EC: &str = "EC";

/// Curve name for NIST P-384
pub const CRV_P384: &str = "P-384";

/// Public key use for signature verification
pub const USE_SIG: &str = "sig";

/// An elliptic-curve public JWK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("EC")
    pub kty: String,
    /// Curve name ("P-384")
    pub crv: String,
    /// Base64url-encoded x coordinate
    pub x: String,
    /// Base64url-encoded y coordinate
    pub y: String,
    /// Key identifier
    pub kid: String,
    /// Intended use ("sig")
    #[serde(rename = "use")]
    pub key_use: String,
    /// Signing algorithm ("ES384")
    pub alg: String,
}

/// A JWK set: `{"keys": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Add a key (builder pattern)
    pub fn with(mut self, key: Jwk) -> Self {
        self.keys.push(key);
        self
    }

    /// Find a key by identifier
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Jwk {
        Jwk {
            kty: KTY_EC.into(),
            crv: CRV_P384.into(),
            x: "x-coord".into(),
            y: "y-coord".into(),
            kid: "k1".into(),
            key_use: USE_SIG.into(),
            alg: "ES384".into(),
        }
    }

    #[test]
    fn test_use_field_renamed() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["use"], "sig");
        assert!(value.get("key_use").is_none());
    }

    #[test]
    fn test_set_lookup() {
        let set = JwkSet::new().with(sample());
        assert!(set.find("k1").is_some());
        assert!(set.find("k2").is_none());

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["keys"].as_array().unwrap().len(), 1);
    }
}
