//! The claim handle exposed to scripts
//!
//! Scripts receive a `ClaimBuilder` value (bound to the variable `builder`)
//! that only supports insertion:
//!
//! ```text
//! builder.claim("scope", "read");
//! builder["groups"] = ["a", "b"];
//! ```
//!
//! There is no way to read a claim back. Values must be JSON-representable.

use claimy_core::ClaimSet;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Position};
use std::sync::{Arc, Mutex, PoisonError};

/// Name of the script-visible type
pub const HANDLE_TYPE_NAME: &str = "ClaimBuilder";

/// Insertion-only view onto the claims a script run is producing
///
/// Clones share the same underlying claims, so a script that copies the
/// handle into another variable still writes to the same request.
#[derive(Debug, Clone, Default)]
pub struct ClaimHandle {
    claims: Arc<Mutex<ClaimSet>>,
}

impl ClaimHandle {
    /// Create an empty handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim from the host side
    pub fn insert(&self, name: impl Into<String>, value: serde_json::Value) {
        self.lock().insert(name, value);
    }

    /// Take every claim written so far, leaving the handle empty
    pub fn take(&self) -> ClaimSet {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClaimSet> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the handle type and its methods with an engine
    pub(crate) fn register(engine: &mut Engine) {
        engine
            .register_type_with_name::<ClaimHandle>(HANDLE_TYPE_NAME)
            .register_fn("claim", script_claim)
            .register_indexer_set(script_claim);
    }
}

/// `builder.claim(name, value)` and `builder[name] = value`
fn script_claim(
    handle: &mut ClaimHandle,
    name: ImmutableString,
    value: Dynamic,
) -> Result<(), Box<EvalAltResult>> {
    if name.is_empty() {
        return Err(runtime_error("claim name must not be empty"));
    }

    let value: serde_json::Value = rhai::serde::from_dynamic(&value).map_err(|e| {
        runtime_error(format!("claim '{}' is not JSON-representable: {}", name, e))
    })?;

    handle.insert(name.as_str(), value);
    Ok(())
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> Engine {
        let mut engine = Engine::new();
        ClaimHandle::register(&mut engine);
        engine
    }

    fn run(script: &str) -> Result<ClaimSet, Box<EvalAltResult>> {
        let engine = engine();
        let handle = ClaimHandle::new();
        let mut scope = rhai::Scope::new();
        scope.push("builder", handle.clone());
        engine.run_with_scope(&mut scope, script)?;
        Ok(handle.take())
    }

    #[test]
    fn test_method_and_indexer_insert() {
        let claims = run(r#"
            builder.claim("scope", "read");
            builder["groups"] = ["a", "b"];
            builder.claim("meta", #{ level: 3, ok: true, none: () });
        "#)
        .unwrap();

        assert_eq!(claims.get("scope"), Some(&json!("read")));
        assert_eq!(claims.get("groups"), Some(&json!(["a", "b"])));
        assert_eq!(claims.get("meta"), Some(&json!({"level": 3, "ok": true, "none": null})));
    }

    #[test]
    fn test_later_write_wins() {
        let claims = run(r#"
            builder.claim("role", "user");
            builder.claim("role", "guest");
        "#)
        .unwrap();

        assert_eq!(claims.get("role"), Some(&json!("guest")));
    }

    #[test]
    fn test_copied_handle_writes_same_claims() {
        let claims = run(r#"
            let b = builder;
            b.claim("copied", 1);
        "#)
        .unwrap();

        assert_eq!(claims.get("copied"), Some(&json!(1)));
    }

    #[test]
    fn test_no_read_back() {
        assert!(run(r#"let x = builder["role"];"#).is_err());
        assert!(run(r#"let x = builder.role;"#).is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(run(r#"builder.claim("", 1);"#).is_err());
    }

    #[test]
    fn test_function_pointer_rejected() {
        assert!(run(r#"builder.claim("f", Fn("print"));"#).is_err());
    }
}
