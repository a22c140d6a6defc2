//! # API Client
//!
//! The single shared request sender. Every request goes through the same
//! pipeline: attach the bearer token (unless `skip_auth`), dispatch, decode
//! the response envelope, and on a 401 run the refresh-and-retry flow
//! (unless `skip_refresh`). A request is retried at most once; a second 401
//! propagates as-is so a rejected refreshed token cannot loop forever.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth::interceptor::{AuthInterceptor, SessionListener};
use crate::auth::token_store::TokenStore;
use crate::core::config::ResolvedConfig;

use super::error::{report, ApiError};
use super::types::ApiEnvelope;

/// Per-request extensions to the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Suppress bearer-token attachment.
    pub skip_auth: bool,
    /// Suppress 401 interception (no refresh, no retry).
    pub skip_refresh: bool,
}

impl RequestOptions {
    /// Both flags set: for endpoints that must neither carry nor mint
    /// credentials (login, register, forgot-password).
    pub fn unauthenticated() -> Self {
        Self {
            skip_auth: true,
            skip_refresh: true,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    interceptor: AuthInterceptor,
}

impl ApiClient {
    /// Builds the shared client. Base URL and timeout come from config; the
    /// refresh and logout endpoints are resolved once, here, because the
    /// interceptor talks to them outside the normal pipeline.
    pub fn new(
        config: &ResolvedConfig,
        tokens: TokenStore,
        listener: Option<Arc<dyn SessionListener>>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let interceptor = AuthInterceptor::new(
            http.clone(),
            tokens.clone(),
            format!("{}{}", base_url, config.endpoints.refresh),
            format!("{}{}", base_url, config.endpoints.logout),
            listener,
        );

        Ok(Self {
            http,
            base_url,
            tokens,
            interceptor,
        })
    }

    pub async fn get<T>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let (envelope, status) = self
            .dispatch::<(), T>(Method::GET, path, None, options)
            .await?;
        envelope
            .into_result(status)
            .inspect_err(|e| report(path, e))
    }

    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (envelope, status) = self
            .dispatch(Method::POST, path, Some(body), options)
            .await?;
        envelope
            .into_result(status)
            .inspect_err(|e| report(path, e))
    }

    /// POST to an endpoint that acknowledges without a payload.
    pub async fn post_ack<B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let (envelope, status) = self
            .dispatch::<B, serde_json::Value>(Method::POST, path, Some(body), options)
            .await?;
        envelope.into_ack(status).inspect_err(|e| report(path, e))
    }

    /// The pipeline. Rebuilding the request on retry re-reads the token
    /// store, so the resend automatically carries the refreshed bearer.
    async fn dispatch<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<(ApiEnvelope<T>, u16), ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let request_id = Uuid::new_v4();
        let mut retried = false;

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if !options.skip_auth
                && let Some(token) = self.tokens.access_token()
            {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!("[{request_id}] {method} {url} (retried={retried})");
            let response = request.send().await.map_err(|e| {
                let err = ApiError::Network(e.to_string());
                report(path, &err);
                err
            })?;
            let status = response.status();
            debug!("[{request_id}] {method} {url} -> {status}");

            if status == StatusCode::UNAUTHORIZED && !options.skip_refresh && !retried {
                retried = true;
                let original = ApiError::Api {
                    status: status.as_u16(),
                    message: error_message(response).await,
                };
                match self.interceptor.handle_unauthorized().await {
                    Ok(_) => {
                        info!("[{request_id}] token refreshed, retrying {method} {url}");
                        continue;
                    }
                    Err(refresh_err) => {
                        // Forced logout already happened; the caller gets
                        // the original auth failure, not the refresh one.
                        debug!("[{request_id}] refresh failed: {refresh_err}");
                        report(path, &original);
                        return Err(original);
                    }
                }
            }

            if !status.is_success() {
                let err = ApiError::Api {
                    status: status.as_u16(),
                    message: error_message(response).await,
                };
                report(path, &err);
                return Err(err);
            }

            let envelope = response.json::<ApiEnvelope<T>>().await.map_err(|e| {
                let err = ApiError::Parse(e.to_string());
                report(path, &err);
                err
            })?;
            return Ok((envelope, status.as_u16()));
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Extracts a readable message from an error response body. Prefers the
/// envelope's `error` field, falls back to the raw body.
async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
        && let Some(message) = envelope.error
    {
        return message;
    }
    if body.trim().is_empty() {
        "request failed".to_string()
    } else {
        body
    }
}
