//! Script engine - compiles scripts once and hands out isolated contexts

use rhai::{Engine, Scope, AST};
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::ScriptContext;
use crate::error::{Result, ScriptError};
use crate::handle::ClaimHandle;
use crate::source::{ScriptSource, SourceLocator};

/// A parsed script, ready to run any number of times
#[derive(Debug, Clone)]
pub struct CompiledScript {
    name: String,
    ast: Arc<AST>,
}

impl CompiledScript {
    /// Source identifier used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

/// Immutable engine plus the ordered list of compiled scripts
///
/// Shared by every request. Each request calls [`ScriptEngine::new_context`]
/// to get a private scope; nothing a script does in one context is visible
/// in another.
#[derive(Clone)]
pub struct ScriptEngine {
    engine: Arc<Engine>,
    scripts: Arc<Vec<CompiledScript>>,
    prototype: Scope<'static>,
}

impl ScriptEngine {
    /// Start configuring an engine
    pub fn builder() -> ScriptEngineBuilder {
        ScriptEngineBuilder::new()
    }

    /// An engine with no scripts; contexts contribute nothing
    pub fn empty() -> Self {
        Self {
            engine: Arc::new(new_engine(0)),
            scripts: Arc::new(Vec::new()),
            prototype: Scope::new(),
        }
    }

    /// Create a context with a private copy of the prototype scope
    pub fn new_context(&self) -> ScriptContext {
        ScriptContext::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.scripts),
            self.prototype.clone(),
        )
    }

    /// Number of compiled scripts
    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    /// Compiled scripts in run order
    pub fn scripts(&self) -> &[CompiledScript] {
        &self.scripts
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("scripts", &self.scripts.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("globals", &self.prototype.len())
            .finish()
    }
}

/// Builder for [`ScriptEngine`]
#[derive(Debug, Default)]
pub struct ScriptEngineBuilder {
    max_operations: u64,
    globals: Vec<(String, serde_json::Value)>,
}

impl ScriptEngineBuilder {
    /// Create a builder with no budget and no globals
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the operations a single script run may perform (0 = unlimited)
    pub fn max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = max_operations;
        self
    }

    /// Seed a variable into every context's scope
    pub fn global(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.globals.push((name.into(), value));
        self
    }

    /// Load and compile every script matched by `locators`
    ///
    /// Each file is compiled as soon as it is read, so the first unreadable
    /// or unparsable file in locator order aborts.
    pub fn compile(self, locators: &[SourceLocator]) -> Result<ScriptEngine> {
        let (engine, prototype) = self.prepare()?;

        let mut scripts = Vec::new();
        for locator in locators {
            for path in locator.resolve()? {
                scripts.push(compile_script(&engine, ScriptSource::read(&path)?)?);
            }
        }

        Ok(self.finish(engine, prototype, scripts))
    }

    /// Compile scripts from already-loaded sources, keeping their order
    ///
    /// Fails on the first script that does not parse.
    pub fn compile_sources(self, sources: Vec<ScriptSource>) -> Result<ScriptEngine> {
        let (engine, prototype) = self.prepare()?;

        let scripts = sources
            .into_iter()
            .map(|source| compile_script(&engine, source))
            .collect::<Result<Vec<_>>>()?;

        Ok(self.finish(engine, prototype, scripts))
    }

    fn prepare(&self) -> Result<(Engine, Scope<'static>)> {
        let engine = new_engine(self.max_operations);

        let mut prototype = Scope::new();
        for (name, value) in &self.globals {
            let value = rhai::serde::to_dynamic(value).map_err(|e| ScriptError::Global {
                name: name.clone(),
                message: e.to_string(),
            })?;
            prototype.push_dynamic(name.as_str(), value);
        }

        Ok((engine, prototype))
    }

    fn finish(
        &self,
        engine: Engine,
        prototype: Scope<'static>,
        scripts: Vec<CompiledScript>,
    ) -> ScriptEngine {
        info!(
            scripts = scripts.len(),
            globals = prototype.len(),
            max_operations = self.max_operations,
            "Script engine ready"
        );

        ScriptEngine {
            engine: Arc::new(engine),
            scripts: Arc::new(scripts),
            prototype,
        }
    }
}

fn compile_script(engine: &Engine, source: ScriptSource) -> Result<CompiledScript> {
    let mut ast = engine.compile(&source.code).map_err(|e| ScriptError::Compile {
        script: source.name.clone(),
        message: e.to_string(),
    })?;
    ast.set_source(source.name.as_str());

    debug!(script = %source.name, "Compiled script");
    Ok(CompiledScript {
        name: source.name,
        ast: Arc::new(ast),
    })
}

fn new_engine(max_operations: u64) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(max_operations);
    engine.disable_symbol("eval");

    engine.on_print(|text| debug!(target: "claimy::script", "{}", text));
    engine.on_debug(|text, source, pos| {
        debug!(
            target: "claimy::script",
            script = source.unwrap_or("<unknown>"),
            position = %pos,
            "{}",
            text
        )
    });

    ClaimHandle::register(&mut engine);
    engine
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_keeps_order() {
        let engine = ScriptEngine::builder()
            .compile_sources(vec![
                ScriptSource::new("b.rhai", "let x = 1;"),
                ScriptSource::new("a.rhai", "let y = 2;"),
            ])
            .unwrap();

        let names: Vec<_> = engine.scripts().iter().map(CompiledScript::name).collect();
        assert_eq!(names, vec!["b.rhai", "a.rhai"]);
        assert_eq!(engine.script_count(), 2);
    }

    #[test]
    fn test_compile_error_names_script() {
        let err = ScriptEngine::builder()
            .compile_sources(vec![
                ScriptSource::new("good.rhai", "let x = 1;"),
                ScriptSource::new("bad.rhai", "let = ;"),
            ])
            .unwrap_err();

        assert!(matches!(err, ScriptError::Compile { .. }));
        assert_eq!(err.script(), Some("bad.rhai"));
    }

    #[test]
    fn test_eval_disabled() {
        let err = ScriptEngine::builder()
            .compile_sources(vec![ScriptSource::new("eval.rhai", r#"eval("1 + 1");"#)])
            .unwrap_err();

        assert!(matches!(err, ScriptError::Compile { .. }));
    }

    #[test]
    fn test_empty_engine() {
        let engine = ScriptEngine::empty();
        assert_eq!(engine.script_count(), 0);
    }
}
