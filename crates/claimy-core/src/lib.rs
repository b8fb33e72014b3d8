//! # Claimy Core
//!
//! Core types and cryptographic primitives for claimy, a service that issues
//! signed tokens whose claims are computed per request.
//!
//! ## Key Concepts
//!
//! - **ClaimSet**: claim name to JSON value mapping carried by a token
//! - **ClaimBuilder**: merges initial, contributed and static claims with
//!   fixed precedence, then stamps `iat`/`exp`
//! - **KeyPair**: the process-lifetime ES384 signing key and its public view
//! - **Media negotiation**: picks a key representation from an `Accept` header
//!
//! ## Claim Precedence
//!
//! 1. Initial claims (lowest)
//! 2. Contributed claims, in contributor order
//! 3. Static claims from configuration
//! 4. Temporal claims (highest, always recomputed)

pub mod claims;
pub mod crypto;
pub mod error;
pub mod jwk;
pub mod media;

pub use claims::{ClaimBuilder, ClaimContributor, ClaimSet, NoContributions, EXPIRATION, ISSUED_AT};
pub use crypto::{KeyPair, PublicKeyView, SignedToken};
pub use error::{Result, TokenError};
pub use jwk::{Jwk, JwkSet};
pub use media::{negotiate, KeyFormat, NegotiationError, JWT_MEDIA_TYPE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
