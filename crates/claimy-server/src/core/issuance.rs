//! Token issuance
//!
//! Ties the pieces of a request together: a fresh script context contributes
//! claims, the claim builder applies static and temporal claims on top, and
//! the key manager signs the result.

use claimy_core::{ClaimBuilder, SignedToken, TokenError};
use claimy_script::{ScriptEngine, ScriptError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::keys::KeyManager;

/// Error returned when a token cannot be issued
#[derive(Error, Debug)]
pub enum IssueError {
    /// A script failed while building claims
    #[error("Claim build failed: {0}")]
    ClaimBuild(#[from] ScriptError),

    /// The claim set could not be signed
    #[error("Signing failed: {0}")]
    Signing(#[from] TokenError),
}

impl IssueError {
    /// Short name of the stage that failed, for logs
    pub fn stage(&self) -> &'static str {
        match self {
            IssueError::ClaimBuild(_) => "claims",
            IssueError::Signing(_) => "signing",
        }
    }

    /// The failing script, when a script caused the error
    pub fn script(&self) -> Option<&str> {
        match self {
            IssueError::ClaimBuild(e) => e.script(),
            IssueError::Signing(_) => None,
        }
    }
}

/// Issues signed tokens
///
/// Stateless per call; safe to share across threads.
#[derive(Debug)]
pub struct TokenService {
    keys: Arc<KeyManager>,
    scripts: ScriptEngine,
    claims: ClaimBuilder,
}

impl TokenService {
    /// Create a token service
    pub fn new(keys: Arc<KeyManager>, scripts: ScriptEngine, claims: ClaimBuilder) -> Self {
        Self {
            keys,
            scripts,
            claims,
        }
    }

    /// Number of scripts run per issuance
    pub fn script_count(&self) -> usize {
        self.scripts.script_count()
    }

    /// Build, sign and return a new token
    ///
    /// Runs scripts synchronously; call from a blocking context.
    pub fn issue(&self) -> Result<SignedToken, IssueError> {
        let result = self.try_issue();

        if let Err(e) = &result {
            error!(
                stage = e.stage(),
                script = e.script().unwrap_or("-"),
                error = %e,
                "Token issuance failed"
            );
        }

        result
    }

    fn try_issue(&self) -> Result<SignedToken, IssueError> {
        let mut context = self.scripts.new_context();
        let claims = self.claims.build(&mut context)?;

        info!(kid = %self.keys.kid(), claims = ?claims.names(), "Issuing token");

        Ok(self.keys.sign(&claims)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimy_core::{ClaimSet, EXPIRATION};
    use claimy_script::ScriptSource;
    use serde_json::json;
    use std::time::Duration;

    fn service(scripts: &[(&str, &str)], claims: ClaimBuilder) -> TokenService {
        let engine = ScriptEngine::builder()
            .compile_sources(
                scripts
                    .iter()
                    .map(|(name, code)| ScriptSource::new(*name, *code))
                    .collect(),
            )
            .unwrap();
        TokenService::new(Arc::new(KeyManager::generate().unwrap()), engine, claims)
    }

    #[test]
    fn test_issue_static_beats_script() {
        let svc = service(
            &[("role.rhai", r#"builder.claim("role", "user"); builder.claim("scope", "read");"#)],
            ClaimBuilder::new().static_claims(ClaimSet::new().with("role", "admin")),
        );

        let token = svc.issue().unwrap();
        let claims = svc.keys.public_view().verify(token.as_str()).unwrap();

        assert_eq!(claims.get("role"), Some(&json!("admin")));
        assert_eq!(claims.get("scope"), Some(&json!("read")));
        assert!(claims.issued_at().is_some());
        assert!(!claims.contains(EXPIRATION));
        assert_eq!(claims.len(), 3);
    }

    #[test]
    fn test_issue_temporal_only() {
        let svc = service(&[], ClaimBuilder::new().valid_for(Duration::from_secs(60)));

        let token = svc.issue().unwrap();
        let claims = svc.keys.public_view().verify(token.as_str()).unwrap();

        assert_eq!(claims.names(), vec!["exp", "iat"]);
        assert_eq!(claims.expiration(), Some(claims.issued_at().unwrap() + 60));
    }

    #[test]
    fn test_script_failure_is_claim_build_error() {
        let svc = service(&[("bad.rhai", r#"throw "no";"#)], ClaimBuilder::new());

        let err = svc.issue().unwrap_err();

        assert!(matches!(err, IssueError::ClaimBuild(_)));
        assert_eq!(err.stage(), "claims");
        assert_eq!(err.script(), Some("bad.rhai"));
    }
}
