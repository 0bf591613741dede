//! Credential verification seam for the admin console.
//!
//! The moderation core carries no authentication logic of its own: login goes
//! through an injected `CredentialVerifier` that checks the credential and
//! issues an opaque session token. The default verifier is backed by the
//! `ADMIN_PASSWORD` environment variable; a real deployment swaps in an
//! external auth service behind the same trait.

use async_trait::async_trait;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Opaque session token issued on successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken(pub String);

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns a token when the credential is valid, `None` otherwise.
    async fn verify(&self, password: &str) -> Result<Option<SessionToken>, AppError>;
}

/// Default verifier: compares against the configured admin password and mints
/// a random token per login. Stateless — no session flag is kept server-side.
pub struct EnvPasswordVerifier {
    password: String,
}

impl EnvPasswordVerifier {
    pub fn new(password: String) -> Self {
        EnvPasswordVerifier { password }
    }
}

#[async_trait]
impl CredentialVerifier for EnvPasswordVerifier {
    async fn verify(&self, password: &str) -> Result<Option<SessionToken>, AppError> {
        if password == self.password {
            Ok(Some(SessionToken(Uuid::new_v4().to_string())))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// POST /api/admin/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    match state.auth.verify(&req.password).await? {
        Some(token) => Ok(Json(LoginResponse {
            success: true,
            detail: Some("Login successful".to_string()),
            token: Some(token.0),
        })),
        None => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_correct_password_yields_token() {
        let verifier = EnvPasswordVerifier::new("hunter2".to_string());
        let token = verifier.verify("hunter2").await.unwrap();
        assert!(token.is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_yields_none() {
        let verifier = EnvPasswordVerifier::new("hunter2".to_string());
        assert!(verifier.verify("letmein").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_unique_per_login() {
        let verifier = EnvPasswordVerifier::new("hunter2".to_string());
        let a = verifier.verify("hunter2").await.unwrap().unwrap();
        let b = verifier.verify("hunter2").await.unwrap().unwrap();
        assert_ne!(a.0, b.0);
    }
}
