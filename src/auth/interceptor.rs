//! # Auth Interceptor Coordinator
//!
//! Owns the single-flight token refresh: when concurrent requests all hit a
//! 401, exactly one refresh call goes out and every waiter shares its
//! outcome. On unrecoverable failure (no refresh token, or the refresh
//! endpoint itself rejects) the coordinator tears the session down: local
//! tokens are cleared unconditionally, a best-effort remote logout is
//! fired, and the configured listener is notified so the shell can drop to
//! an unauthenticated view.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::types::ApiEnvelope;

use super::token_store::{TokenPair, TokenStore};

/// Notified when the session can no longer be recovered. The application's
/// composition root typically wires this to whatever owns navigation state.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_session_expired(&self);
}

/// Errors from the refresh flow. `Clone` because the outcome fans out to
/// every request awaiting the shared refresh future.
#[derive(Debug, Clone)]
pub enum RefreshError {
    /// No refresh token in the store; nothing to exchange.
    MissingToken,
    /// The refresh endpoint answered with an error.
    Rejected { status: u16, message: String },
    Network(String),
    Parse(String),
    Storage(String),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::MissingToken => write!(f, "no refresh token stored"),
            RefreshError::Rejected { status, message } => {
                write!(f, "refresh rejected (HTTP {status}): {message}")
            }
            RefreshError::Network(msg) => write!(f, "refresh network error: {msg}"),
            RefreshError::Parse(msg) => write!(f, "refresh parse error: {msg}"),
            RefreshError::Storage(msg) => write!(f, "refresh storage error: {msg}"),
        }
    }
}

impl std::error::Error for RefreshError {}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshError>>>;

#[derive(Clone)]
pub struct AuthInterceptor {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    tokens: TokenStore,
    refresh_url: String,
    logout_url: String,
    listener: Option<Arc<dyn SessionListener>>,
    /// At most one refresh in flight; the future clears the slot itself
    /// once it settles.
    refresh_slot: Mutex<Option<SharedRefresh>>,
}

impl AuthInterceptor {
    pub fn new(
        http: reqwest::Client,
        tokens: TokenStore,
        refresh_url: String,
        logout_url: String,
        listener: Option<Arc<dyn SessionListener>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                tokens,
                refresh_url,
                logout_url,
                listener,
                refresh_slot: Mutex::new(None),
            }),
        }
    }

    /// Handles a 401 observed by the request pipeline: refresh (joining any
    /// in-flight attempt) and hand back the new access token, or force
    /// logout and surface the failure.
    pub async fn handle_unauthorized(&self) -> Result<String, RefreshError> {
        match self.refresh_token().await {
            Ok(pair) => Ok(pair.access_token),
            Err(err) => {
                warn!("token refresh failed: {err}");
                self.force_logout().await;
                Err(err)
            }
        }
    }

    /// Exchanges the stored refresh token for a new pair and persists it.
    /// Only the request pipeline calls this; the exchange itself bypasses
    /// bearer attachment and 401 interception entirely.
    pub async fn refresh_token(&self) -> Result<TokenPair, RefreshError> {
        let future = {
            let mut slot = self.inner.refresh_slot.lock().await;
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!("refresh already in flight, joining it");
                    in_flight.clone()
                }
                None => {
                    let future = Self::run_exchange(self.inner.clone()).boxed().shared();
                    *slot = Some(future.clone());
                    future
                }
            }
        };
        future.await
    }

    async fn run_exchange(inner: Arc<Inner>) -> Result<TokenPair, RefreshError> {
        let result = Self::exchange(&inner).await;
        // Free the slot so the next 401 epoch starts a fresh exchange.
        *inner.refresh_slot.lock().await = None;
        match &result {
            Ok(_) => info!("access token refreshed"),
            Err(err) => debug!("refresh exchange failed: {err}"),
        }
        result
    }

    async fn exchange(inner: &Inner) -> Result<TokenPair, RefreshError> {
        let refresh_token = inner
            .tokens
            .refresh_token()
            .ok_or(RefreshError::MissingToken)?;

        let response = inner
            .http
            .post(&inner.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<TokenPair> = response
            .json()
            .await
            .map_err(|e| RefreshError::Parse(e.to_string()))?;
        if !envelope.success {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "refresh rejected".to_string()),
            });
        }
        let pair = envelope
            .data
            .ok_or_else(|| RefreshError::Parse("refresh response carried no token pair".to_string()))?;

        inner
            .tokens
            .set_tokens(&pair)
            .map_err(|e| RefreshError::Storage(e.to_string()))?;
        Ok(pair)
    }

    /// Tears the session down after an unrecoverable auth failure. Local
    /// clearing always happens; the remote logout call is best-effort and
    /// its failure is ignored.
    pub async fn force_logout(&self) {
        let bearer = self.inner.tokens.access_token();
        if bearer.is_none() && self.inner.tokens.refresh_token().is_none() {
            // Already logged out: another waiter on the same failed refresh
            // got here first.
            return;
        }
        self.inner.tokens.clear();

        let mut request = self.inner.http.post(&self.inner.logout_url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Err(err) = request.send().await {
            debug!("best-effort logout call failed, ignoring: {err}");
        }

        if let Some(listener) = &self.inner.listener {
            listener.on_session_expired().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{memory_token_store, RecordingListener};

    fn interceptor_for(
        server_uri: &str,
        tokens: TokenStore,
        listener: Option<Arc<dyn SessionListener>>,
    ) -> AuthInterceptor {
        AuthInterceptor::new(
            reqwest::Client::new(),
            tokens,
            format!("{server_uri}/auth/refresh"),
            format!("{server_uri}/auth/logout"),
            listener,
        )
    }

    fn seed(tokens: &TokenStore, access: &str, refresh: &str) {
        tokens
            .set_tokens(&TokenPair {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
                expires_at: None,
            })
            .unwrap();
    }

    fn refresh_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "accessToken": "a2", "refreshToken": "b2" }
        }))
    }

    #[tokio::test]
    async fn test_refresh_sends_stored_token_and_persists_rotated_pair() {
        let server = MockServer::start().await;
        let tokens = memory_token_store();
        seed(&tokens, "a1", "b1");

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(serde_json::json!({ "refreshToken": "b1" })))
            .respond_with(refresh_ok())
            .expect(1)
            .mount(&server)
            .await;

        let interceptor = interceptor_for(&server.uri(), tokens.clone(), None);
        let pair = interceptor.refresh_token().await.unwrap();
        assert_eq!(pair.access_token, "a2");
        assert_eq!(tokens.access_token().as_deref(), Some("a2"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("b2"));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_exchange() {
        let server = MockServer::start().await;
        let tokens = memory_token_store();
        seed(&tokens, "a1", "b1");

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(refresh_ok().set_delay(Duration::from_millis(50)))
            .expect(1)
            .mount(&server)
            .await;

        let interceptor = interceptor_for(&server.uri(), tokens, None);
        let (r1, r2, r3) = tokio::join!(
            interceptor.refresh_token(),
            interceptor.refresh_token(),
            interceptor.refresh_token(),
        );
        assert_eq!(r1.unwrap().access_token, "a2");
        assert_eq!(r2.unwrap().access_token, "a2");
        assert_eq!(r3.unwrap().access_token, "a2");
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_get_their_own_exchange() {
        let server = MockServer::start().await;
        let tokens = memory_token_store();
        seed(&tokens, "a1", "b1");

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(refresh_ok())
            .expect(2)
            .mount(&server)
            .await;

        let interceptor = interceptor_for(&server.uri(), tokens, None);
        interceptor.refresh_token().await.unwrap();
        interceptor.refresh_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_an_error() {
        let server = MockServer::start().await;
        let interceptor = interceptor_for(&server.uri(), memory_token_store(), None);
        let result = interceptor.refresh_token().await;
        assert!(matches!(result, Err(RefreshError::MissingToken)));
    }

    #[tokio::test]
    async fn test_unauthorized_with_failed_refresh_forces_logout() {
        let server = MockServer::start().await;
        let tokens = memory_token_store();
        seed(&tokens, "a1", "b1");

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "success": false,
                "error": "refresh token expired"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let listener = Arc::new(RecordingListener::default());
        let interceptor =
            interceptor_for(&server.uri(), tokens.clone(), Some(listener.clone()));

        let result = interceptor.handle_unauthorized().await;
        assert!(matches!(result, Err(RefreshError::Rejected { status: 401, .. })));
        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert_eq!(listener.expirations(), 1);
    }

    #[tokio::test]
    async fn test_force_logout_on_empty_store_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let listener = Arc::new(RecordingListener::default());
        let interceptor =
            interceptor_for(&server.uri(), memory_token_store(), Some(listener.clone()));
        interceptor.force_logout().await;
        assert_eq!(listener.expirations(), 0);
    }

    #[test]
    fn test_refresh_error_display() {
        let err = RefreshError::Rejected {
            status: 401,
            message: "expired".to_string(),
        };
        assert_eq!(err.to_string(), "refresh rejected (HTTP 401): expired");
        assert_eq!(RefreshError::MissingToken.to_string(), "no refresh token stored");
    }
}
