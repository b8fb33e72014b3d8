//! Per-request script context

use claimy_core::{ClaimContributor, ClaimSet};
use rhai::{Engine, Scope};
use std::sync::Arc;
use tracing::debug;

use crate::engine::CompiledScript;
use crate::error::{Result, ScriptError};
use crate::handle::ClaimHandle;

/// Variable name scripts use to reach the claim handle
pub const BUILDER_VARIABLE: &str = "builder";

/// An isolated scope for one request
///
/// Created by [`ScriptEngine::new_context`](crate::ScriptEngine::new_context).
/// Not shared between requests; dropped when the request completes.
pub struct ScriptContext {
    engine: Arc<Engine>,
    scripts: Arc<Vec<CompiledScript>>,
    scope: Scope<'static>,
}

impl ScriptContext {
    pub(crate) fn new(
        engine: Arc<Engine>,
        scripts: Arc<Vec<CompiledScript>>,
        scope: Scope<'static>,
    ) -> Self {
        Self {
            engine,
            scripts,
            scope,
        }
    }

    /// Bind a claim handle to `name` in this context's scope
    pub fn inject(&mut self, name: &str, handle: ClaimHandle) {
        self.scope.set_or_push(name, handle);
    }

    /// Run one script against this context's scope
    pub fn run(&mut self, script: &CompiledScript) -> Result<()> {
        debug!(script = %script.name(), "Running script");
        self.engine
            .run_ast_with_scope(&mut self.scope, script.ast())
            .map_err(|e| ScriptError::Runtime {
                script: script.name().to_string(),
                message: e.to_string(),
            })
    }

    /// Run every compiled script in order, stopping at the first failure
    pub fn run_all(&mut self) -> Result<()> {
        let scripts = Arc::clone(&self.scripts);
        scripts.iter().try_for_each(|script| self.run(script))
    }
}

impl ClaimContributor for ScriptContext {
    type Error = ScriptError;

    fn contribute(&mut self, claims: &mut ClaimSet) -> Result<()> {
        let handle = ClaimHandle::new();
        self.inject(BUILDER_VARIABLE, handle.clone());

        self.run_all()?;

        claims.merge(&handle.take());
        Ok(())
    }
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("scripts", &self.scripts.len())
            .field("variables", &self.scope.len())
            .finish()
    }
}
