//! Session authentication. Callers send the auth provider's session token as
//! `Authorization: Bearer <token>`; the provider resolves it to a user id.
//!
//! `AppState` carries an `Arc<dyn SessionVerifier>` so tests can swap the
//! provider out.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Resolves a session token to the provider's user id.
    /// `Ok(None)` means the token is invalid or expired.
    async fn verify(&self, token: &str) -> Result<Option<String>, AppError>;
}

/// Providers differ in where they put the user id; any of these may be present.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerifiedSession {
    user_id: Option<String>,
    #[serde(rename = "userId")]
    user_id_camel: Option<String>,
    sub: Option<String>,
}

impl VerifiedSession {
    /// First non-blank id, preferring `user_id`, then `userId`, then `sub`.
    fn into_user_id(self) -> Option<String> {
        [self.user_id, self.user_id_camel, self.sub]
            .into_iter()
            .flatten()
            .map(|id| id.trim().to_string())
            .find(|id| !id.is_empty())
    }
}

/// Verifies tokens against the provider's HTTP verification endpoint.
pub struct HttpSessionVerifier {
    client: Client,
    verify_url: String,
}

impl HttpSessionVerifier {
    pub fn new(verify_url: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(VERIFY_TIMEOUT).build()?,
            verify_url,
        })
    }
}

#[async_trait]
impl SessionVerifier for HttpSessionVerifier {
    async fn verify(&self, token: &str) -> Result<Option<String>, AppError> {
        let response = self
            .client
            .get(&self.verify_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Session verification failed: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let session: VerifiedSession = response.json().await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Malformed session response: {e}"))
                })?;
                Ok(session.into_user_id())
            }
            status => Err(AppError::Internal(anyhow::anyhow!(
                "Auth provider returned {status}"
            ))),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer …` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// The authenticated caller. Add it to a handler's arguments to require a session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::Unauthorized)?;

        match state.sessions.verify(token).await? {
            Some(user_id) => Ok(AuthUser { user_id }),
            None => {
                warn!("Rejected request with invalid session token");
                Err(AppError::Unauthorized)
            }
        }
    }
}
