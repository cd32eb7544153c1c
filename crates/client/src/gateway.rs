//! API gateway client.
//!
//! The single HTTP wrapper every other component calls through. Each request:
//!
//! 1. Attaches `Authorization: Bearer <access>` when a token is held.
//! 2. Unwraps a `{"data": T}` envelope transparently.
//! 3. On a 401 that is neither an auth-endpoint call nor already a retry,
//!    runs the session manager's single-flight refresh and re-issues the
//!    original request exactly once. A failed refresh propagates the
//!    *original* 401 - the session manager has already torn the session down.
//! 4. Propagates every other failure as a typed [`ApiError`].
//!
//! The retry counter caps at one per originating request, so a persistently
//! invalid refresh token cannot loop.

use std::sync::Arc;

use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::session::SessionManager;
use crate::wire;

/// HTTP client for the Sweet Shop REST service.
///
/// Cheap to clone; all clones share the underlying connection pool and the
/// session manager handle.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: SessionManager,
}

impl ApiClient {
    /// Create a gateway client bound to `session`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionManager) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::from_transport)?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.clone(),
                session,
            }),
        })
    }

    /// The session manager this client authenticates through.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    // =========================================================================
    // Verb operations
    // =========================================================================

    /// GET `path` and deserialize the (unwrapped) body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, server, or parse failure.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None, None).await?;
        wire::read_json(response).await
    }

    /// GET `path` with query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, server, or parse failure.
    pub async fn get_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        let query = serde_json::to_value(query)?;
        let response = self.send(Method::GET, path, Some(query), None).await?;
        wire::read_json(response).await
    }

    /// POST `body` to `path` and deserialize the response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, server, or parse failure.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::POST, path, None, Some(body)).await?;
        wire::read_json(response).await
    }

    /// POST `body` to `path`, discarding the response body.
    ///
    /// For endpoints that confirm with plain text rather than JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or server failure.
    pub async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, None, Some(body)).await?;
        Ok(())
    }

    /// PUT `body` to `path` and deserialize the response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, server, or parse failure.
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::PUT, path, None, Some(body)).await?;
        wire::read_json(response).await
    }

    /// DELETE `path`, discarding the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or server failure.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None, None).await?;
        Ok(())
    }

    // =========================================================================
    // Core request loop
    // =========================================================================

    /// Issue one request, with at most one refresh-and-retry on 401.
    #[instrument(level = "debug", skip(self, query, body), fields(%method, path))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<Value>,
        body: Option<Value>,
    ) -> Result<Response> {
        let url = self.endpoint(path)?;
        let mut retried = false;

        loop {
            let token = self.inner.session.access_token();

            let mut request = self.inner.http.request(method.clone(), url.clone());
            if let Some(query) = &query {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }
            if let Some(token) = &token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await.map_err(ApiError::from_transport)?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED
                && !retried
                && !is_auth_path(path)
            {
                let original = wire::error_from_response(response).await;

                // Coalesced refresh: the token this request used marks it
                // stale, so concurrent 401s share one rotation.
                let stale = token.unwrap_or_default();
                match self.inner.session.refresh_if_stale(&stale).await {
                    Ok(_) => {
                        debug!(path, "retrying after token refresh");
                        retried = true;
                        continue;
                    }
                    Err(refresh_err) => {
                        // Session teardown already happened inside the
                        // session manager; surface the original failure.
                        warn!(path, error = %refresh_err, "token refresh failed");
                        return Err(original);
                    }
                }
            }

            if !status.is_success() {
                return Err(wire::error_from_response(response).await);
            }

            return Ok(response);
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner.base_url.join(path).map_err(|e| ApiError::Validation {
            field: "path",
            message: format!("{path}: {e}"),
        })
    }
}

/// Auth endpoints never trigger the refresh-and-retry path; a 401 from them
/// is a real answer, not a stale token.
fn is_auth_path(path: &str) -> bool {
    path.trim_start_matches('/').starts_with("auth/")
}
