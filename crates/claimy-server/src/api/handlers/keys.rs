//! Public Key Handlers
//!
//! Serves the signing key's public half so that clients can verify issued
//! tokens.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use claimy_core::{negotiate, KeyFormat};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;
use crate::keys::Rendered;

/// Get a single public key
///
/// GET /keys/{kid}
///
/// The representation is chosen from the `Accept` header: JWK by default,
/// PEM on request. Parameters in the header are rejected.
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(kid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if kid != state.keys.kid() {
        info!(kid = %kid, "Unknown key requested");
        return Err(ApiError::NotFound(format!("key '{}'", kid)));
    }

    let accept = match headers.get(header::ACCEPT) {
        Some(value) => value.to_str().map_err(|e| {
            info!(error = %e, "Accept header is not valid text");
            ApiError::BadRequest(e.to_string())
        })?,
        None => "",
    };

    let format = negotiate(accept).map_err(|e| {
        info!(accept = %accept, error = %e, "Key negotiation failed");
        ApiError::from(e)
    })?;

    debug!(kid = %kid, format = %format, "Serving public key");
    Ok(rendered_response(state.keys.render(format)?))
}

/// Get the key set
///
/// GET /keys
///
/// Always a JWK set holding the one signing key, whatever `Accept` says.
pub async fn list_keys(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    Ok(rendered_response(state.keys.render(KeyFormat::JwkSet)?))
}

fn rendered_response(rendered: Rendered) -> Response {
    ([(header::CONTENT_TYPE, rendered.media_type)], rendered.body).into_response()
}
