//! # Auth Service
//!
//! High-level auth operations: thin orchestration over the API client and
//! the token store. The refresh flow is not here; it belongs to the
//! interceptor coordinator, which the client invokes on 401.

use log::{debug, info};

use crate::api::client::{ApiClient, RequestOptions};
use crate::api::error::ApiError;
use crate::core::config::Endpoints;

use super::token_store::{TokenPair, TokenStore};
use super::types::{
    AuthSession, AuthUser, ChangePasswordRequest, Credentials, ForgotPasswordRequest,
    RegisterPayload, RegisterRequest, RegisteredAccount, SessionPayload,
};

pub struct AuthService {
    client: ApiClient,
    tokens: TokenStore,
    endpoints: Endpoints,
}

impl AuthService {
    pub fn new(client: ApiClient, tokens: TokenStore, endpoints: Endpoints) -> Self {
        Self {
            client,
            tokens,
            endpoints,
        }
    }

    /// Signs in and stores the returned token pair. A `success: false`
    /// response errors out before the store is touched.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        let payload: SessionPayload = self
            .client
            .post(
                &self.endpoints.login,
                credentials,
                RequestOptions::unauthenticated(),
            )
            .await?;

        let pair = TokenPair {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at: payload.expires_at,
        };
        self.tokens
            .set_tokens(&pair)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        info!("logged in as {}", payload.user.email);

        Ok(AuthSession {
            user: payload.user,
            tokens: pair,
        })
    }

    /// Creates an account. When the response carries tokens the backend has
    /// auto-logged the account in, and the pair is stored.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredAccount, ApiError> {
        let payload: RegisterPayload = self
            .client
            .post(
                &self.endpoints.register,
                request,
                RequestOptions::unauthenticated(),
            )
            .await?;

        let tokens = match (payload.access_token, payload.refresh_token) {
            (Some(access_token), Some(refresh_token)) => {
                let pair = TokenPair {
                    access_token,
                    refresh_token,
                    expires_at: payload.expires_at,
                };
                self.tokens
                    .set_tokens(&pair)
                    .map_err(|e| ApiError::Storage(e.to_string()))?;
                debug!("registration auto-login, token pair stored");
                Some(pair)
            }
            _ => None,
        };
        info!("registered account {}", payload.user.email);

        Ok(RegisteredAccount {
            user: payload.user,
            tokens,
        })
    }

    /// Ends the session. The server call is best-effort (its failure is
    /// logged and ignored); local tokens are cleared unconditionally.
    pub async fn logout(&self) {
        let options = RequestOptions {
            skip_auth: false,
            skip_refresh: true,
        };
        let body = serde_json::json!({});
        if let Err(err) = self
            .client
            .post_ack(&self.endpoints.logout, &body, options)
            .await
        {
            debug!("logout request failed, ignoring: {err}");
        }
        self.tokens.clear();
        info!("logged out");
    }

    /// Fetches the user behind the current session.
    pub async fn current_user(&self) -> Result<AuthUser, ApiError> {
        self.client
            .get(&self.endpoints.current_user, RequestOptions::default())
            .await
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let body = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.client
            .post_ack(
                &self.endpoints.change_password,
                &body,
                RequestOptions::default(),
            )
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.client
            .post_ack(
                &self.endpoints.forgot_password,
                &body,
                RequestOptions::unauthenticated(),
            )
            .await
    }

    /// Whether an access token is stored locally. Says nothing about
    /// whether the server would still accept it.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.access_token().is_some()
    }
}
