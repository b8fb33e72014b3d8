//! Signing key management

mod manager;

pub use manager::{KeyManager, Rendered};
