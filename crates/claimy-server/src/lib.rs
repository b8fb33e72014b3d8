//! Claimy Server
//!
//! HTTP service that issues ES384-signed JWTs whose claims are computed per
//! request by operator-supplied scripts, merged with statically configured
//! claims.
//!
//! ## Startup
//!
//! 1. Load [`Config`] (TOML file plus `CLAIMY_*` environment overrides)
//! 2. Generate the signing key; the process keeps it until exit
//! 3. Compile every configured script once
//! 4. Serve until SIGINT/SIGTERM, then drain for the configured grace period
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with key ID and script count
//! - `GET /keys` - JWK set holding the signing key
//! - `GET /keys/{kid}` - The signing key as JWK or PEM, by `Accept`
//! - `GET|POST /issue` - A freshly built and signed token (`application/jwt`)

pub mod api;
pub mod config;
pub mod core;
pub mod keys;
pub mod server;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{Config, ConfigError};
pub use crate::core::{IssueError, TokenService};
pub use keys::{KeyManager, Rendered};
pub use server::{serve_until, shutdown_runtime, shutdown_signal, ShutdownOutcome};
