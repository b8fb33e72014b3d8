//! Token Issuance Handler

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use claimy_core::JWT_MEDIA_TYPE;
use std::sync::Arc;
use tracing::error;

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

/// Issue a signed token
///
/// GET /issue, POST /issue
///
/// The request carries nothing the claims depend on; scripts and static
/// configuration decide them. Scripts run on the blocking pool.
pub async fn issue_token(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let tokens = Arc::clone(&state.tokens);

    let token = tokio::task::spawn_blocking(move || tokens.issue())
        .await
        .map_err(|e| {
            error!(error = %e, "Issuance task did not complete");
            ApiError::Internal(e.to_string())
        })??;

    Ok(([(header::CONTENT_TYPE, JWT_MEDIA_TYPE)], token.into_string()).into_response())
}
