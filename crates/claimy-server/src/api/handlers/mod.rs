//! API request handlers

pub mod issue;
pub mod keys;

use std::sync::Arc;

use crate::core::TokenService;
use crate::keys::KeyManager;

pub use issue::issue_token;
pub use keys::{get_key, list_keys};

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// The process signing key
    pub keys: Arc<KeyManager>,
    /// Token issuance, sharing `keys`
    pub tokens: Arc<TokenService>,
}
