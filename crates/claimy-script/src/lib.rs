//! # Claim Scripts
//!
//! Runs operator-supplied [Rhai](https://rhai.rs) scripts that compute claims
//! for each issued token.
//!
//! ## Lifecycle
//!
//! 1. At startup, [`SourceLocator`] patterns are expanded and globbed, and
//!    every matching file is compiled once into a [`ScriptEngine`].
//! 2. For each request, [`ScriptEngine::new_context`] produces a
//!    [`ScriptContext`] whose scope is a private copy of the configured
//!    globals.
//! 3. The context runs as a [`ClaimContributor`](claimy_core::ClaimContributor):
//!    scripts run in order against an insertion-only `builder` handle, and
//!    the first failure aborts the request.
//!
//! ## Usage
//!
//! ```ignore
//! use claimy_core::ClaimBuilder;
//! use claimy_script::{ScriptEngine, SourceLocator};
//!
//! let engine = ScriptEngine::builder()
//!     .max_operations(100_000)
//!     .compile(&[SourceLocator::new("$CONFIG_DIR/claims/*.rhai")])?;
//!
//! let claims = ClaimBuilder::new().build(&mut engine.new_context())?;
//! ```
//!
//! ## Sandbox
//!
//! Rhai has no file or network access. `eval` is disabled, and `print` /
//! `debug` go to the tracing log.

pub mod context;
pub mod engine;
pub mod error;
pub mod handle;
pub mod source;

pub use context::{ScriptContext, BUILDER_VARIABLE};
pub use engine::{CompiledScript, ScriptEngine, ScriptEngineBuilder};
pub use error::{Result, ScriptError};
pub use handle::ClaimHandle;
pub use source::{ScriptSource, SourceLocator};
