//! Claimy Server Binary
//!
//! Runs the token issuance HTTP server.

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use claimy_core::ClaimBuilder;
use claimy_script::ScriptEngine;
use claimy_server::{
    create_router, serve_until, shutdown_runtime, shutdown_signal, AppState, Config, KeyManager,
    TokenService,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let log_level = env::var("CLAIMY_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    // Configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Signing key, generated once per process
    let keys = Arc::new(KeyManager::generate().context("Failed to generate signing key")?);

    // Scripts, compiled once
    let scripts = config
        .globals
        .iter()
        .fold(
            ScriptEngine::builder().max_operations(config.max_operations),
            |builder, (name, value)| builder.global(name.clone(), value.clone()),
        )
        .compile(&config.script_locators())
        .context("Failed to compile claim scripts")?;

    let claims = ClaimBuilder::new()
        .static_claims(config.claims.clone())
        .valid_for(config.valid_for);

    info!(
        kid = %keys.kid(),
        scripts = scripts.script_count(),
        static_claims = ?claims.statics().names(),
        valid_for = %humantime::format_duration(config.valid_for),
        "Starting claimy server"
    );

    let tokens = Arc::new(TokenService::new(Arc::clone(&keys), scripts, claims));
    let state = Arc::new(AppState { keys, tokens });

    // Build router
    let app = create_router(state);

    // Built by hand so shutdown never waits on a script that will not finish
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(config.address)
            .await
            .with_context(|| format!("Failed to bind to {}", config.address))?;

        info!(addr = %config.address, "Claimy listening");

        serve_until(listener, app, shutdown_signal(), config.shutdown_grace)
            .await
            .context("Server error")
    });

    let outcome = match served {
        Ok(outcome) => outcome,
        Err(e) => {
            runtime.shutdown_background();
            return Err(e);
        }
    };
    shutdown_runtime(runtime, outcome);

    info!(?outcome, "Claimy stopped");
    Ok(())
}
