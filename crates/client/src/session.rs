//! Session manager: login, registration, token refresh, and teardown.
//!
//! The session manager exclusively owns the access/refresh token pair. It is
//! constructed once at application start, handed to the gateway client as an
//! explicit dependency, and torn down by `logout` - there is no ambient
//! global.
//!
//! Refresh attempts are coalesced: concurrent callers share one in-flight
//! refresh through an async gate, so a burst of 401s rotates the token once
//! instead of racing.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use sweet_shop_core::{Email, UserProfile};

use crate::config::ClientConfig;
use crate::error::{ApiError, AuthError, Result};
use crate::store::{CredentialStore, Credentials};
use crate::{token, wire};

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Derived view of the current session.
///
/// Recomputed from the stored credentials; never persisted on its own. The
/// embedded profile is a cache - the access token stays authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Whether a token pair is currently held.
    pub authenticated: bool,
    /// Profile decoded from the access token, when one is held.
    pub user: Option<UserProfile>,
    /// Whether the token carries the admin role.
    pub admin: bool,
}

impl Session {
    fn from_credentials(credentials: Option<&Credentials>) -> Self {
        credentials.map_or_else(Self::default, |creds| {
            let user = creds.user.clone();
            let admin = user.as_ref().is_some_and(|u| u.role.is_admin());
            Self {
                authenticated: true,
                user,
                admin,
            }
        })
    }
}

/// Input for `register`.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Email address (validated at construction).
    pub email: Email,
    /// Plain-text password, sent once over the wire.
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Callback invoked when the session is torn down because a refresh was
/// rejected (the CLI analog of "redirect to login").
pub type ExpiryHook = Box<dyn Fn() + Send + Sync>;

/// Owns the token pair and the auth endpoints.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn CredentialStore>,
    // In-memory mirror of the store; `current_session` reads it without I/O.
    state: RwLock<Option<Credentials>>,
    // Single-flight gate for refresh.
    refresh_gate: tokio::sync::Mutex<()>,
    expiry_hook: RwLock<Option<ExpiryHook>>,
}

impl SessionManager {
    /// Create a session manager, restoring any credentials the store holds
    /// from a previous run.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Store`] if persisted credentials cannot be read,
    /// or [`ApiError::Network`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::from_transport)?;

        let restored = store.load()?;
        if restored.is_some() {
            debug!("restored persisted session");
        }

        Ok(Self {
            inner: Arc::new(SessionInner {
                http,
                base_url: config.base_url.clone(),
                store,
                state: RwLock::new(restored),
                refresh_gate: tokio::sync::Mutex::new(()),
                expiry_hook: RwLock::new(None),
            }),
        })
    }

    /// Register a hook to run when the session is torn down after a failed
    /// refresh. Replaces any previous hook.
    pub fn set_expiry_hook(&self, hook: ExpiryHook) {
        if let Ok(mut slot) = self.inner.expiry_hook.write() {
            *slot = Some(hook);
        }
    }

    // =========================================================================
    // Login / Register
    // =========================================================================

    /// Log in with email and password, storing the returned token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the server rejects the
    /// credentials, [`ApiError::Validation`] for an empty password, and the
    /// usual transport/server errors otherwise.
    pub async fn login(&self, email: &Email, password: &str) -> Result<Session> {
        if password.is_empty() {
            return Err(ApiError::Validation {
                field: "password",
                message: "password cannot be empty".to_string(),
            });
        }

        let url = self.endpoint("auth/login");
        let request = LoginRequest {
            email: email.as_str(),
            password,
        };

        let response = self
            .inner
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !response.status().is_success() {
            return Err(wire::error_from_response(response).await);
        }

        let tokens: LoginResponse = wire::read_json(response).await?;
        let user = token::decode_claims(&tokens.access_token).and_then(|c| c.to_profile());
        let credentials = Credentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user,
        };

        self.replace_credentials(Some(credentials))?;
        info!(user = %email, "logged in");
        Ok(self.current_session())
    }

    /// Register a new account.
    ///
    /// Registration does **not** establish a session; call
    /// [`login`](Self::login) afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for an empty name or a short
    /// password, and server/transport errors otherwise.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        if registration.name.trim().is_empty() {
            return Err(ApiError::Validation {
                field: "name",
                message: "name cannot be empty".to_string(),
            });
        }
        if registration.password.len() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::Validation {
                field: "password",
                message: format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
            });
        }

        let url = self.endpoint("auth/register");
        let request = RegisterRequest {
            name: &registration.name,
            email: registration.email.as_str(),
            password: &registration.password,
        };

        let response = self
            .inner
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        if !response.status().is_success() {
            return Err(wire::error_from_response(response).await);
        }

        info!(user = %registration.email, "registered");
        Ok(())
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Obtain a new access token using the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshFailed`] when no refresh token is stored
    /// or the server rejects it; in that case the session has already been
    /// torn down. Transport errors propagate without teardown.
    pub async fn refresh(&self) -> Result<String> {
        let _guard = self.inner.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Single-flight refresh for the gateway's 401 path.
    ///
    /// `stale_token` is the access token the failing request used. If the
    /// stored token already differs when the gate is acquired, another caller
    /// refreshed first and its result is shared instead of issuing a second
    /// network refresh.
    ///
    /// # Errors
    ///
    /// Same as [`refresh`](Self::refresh).
    pub async fn refresh_if_stale(&self, stale_token: &str) -> Result<String> {
        let _guard = self.inner.refresh_gate.lock().await;

        if let Some(current) = self.access_token()
            && current != stale_token
        {
            debug!("token already rotated by a concurrent refresh");
            return Ok(current);
        }

        self.refresh_locked().await
    }

    // Caller must hold `refresh_gate`.
    async fn refresh_locked(&self) -> Result<String> {
        let Some(refresh_token) = self.refresh_token() else {
            self.teardown("no refresh token stored")?;
            return Err(AuthError::RefreshFailed("no refresh token stored".to_string()).into());
        };

        let url = self.endpoint("auth/refresh");
        let request = RefreshRequest {
            refresh_token: &refresh_token,
        };

        let response = self
            .inner
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        if !response.status().is_success() {
            let err = wire::error_from_response(response).await;
            let reason = err.to_string();
            self.teardown(&reason)?;
            return Err(AuthError::RefreshFailed(reason).into());
        }

        let refreshed: RefreshResponse = wire::read_json(response).await?;

        // Rotate only the access token; refresh token and profile stay.
        let updated = {
            let state = self
                .inner
                .state
                .read()
                .map_err(|_| crate::store::StoreError::Poisoned)?;
            state.clone().map(|mut creds| {
                creds.access_token = refreshed.access_token.clone();
                creds
            })
        };
        self.replace_credentials(updated)?;

        debug!("access token refreshed");
        Ok(refreshed.access_token)
    }

    // =========================================================================
    // Logout / Reads
    // =========================================================================

    /// Clear all persisted credentials and in-memory state. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Store`] if the backing store cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.replace_credentials(None)?;
        info!("logged out");
        Ok(())
    }

    /// Current session view. Pure in-memory read, never touches the network.
    #[must_use]
    pub fn current_session(&self) -> Session {
        self.inner
            .state
            .read()
            .map_or_else(|_| Session::default(), |s| Session::from_credentials(s.as_ref()))
    }

    /// Whether a token pair is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_session().authenticated
    }

    /// The stored access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|c| c.access_token.clone()))
    }

    /// Whether `token` is expired. Fail-closed: an undecodable token counts
    /// as expired.
    #[must_use]
    pub fn is_token_expired(token: &str) -> bool {
        crate::token::is_expired(token)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn refresh_token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|c| c.refresh_token.clone()))
    }

    fn endpoint(&self, path: &str) -> Url {
        // Base URL is validated as a base at config time; joining a relative
        // path cannot fail.
        self.inner
            .base_url
            .join(path)
            .unwrap_or_else(|_| self.inner.base_url.clone())
    }

    /// Write-through: in-memory state and the persistent store move together.
    fn replace_credentials(&self, credentials: Option<Credentials>) -> Result<()> {
        match &credentials {
            Some(creds) => self.inner.store.save(creds)?,
            None => self.inner.store.clear()?,
        }
        let mut state = self
            .inner
            .state
            .write()
            .map_err(|_| crate::store::StoreError::Poisoned)?;
        *state = credentials;
        Ok(())
    }

    /// Forced logout after a rejected refresh; fires the expiry hook.
    fn teardown(&self, reason: &str) -> Result<()> {
        warn!(reason, "session torn down");
        self.replace_credentials(None)?;
        if let Ok(hook) = self.inner.expiry_hook.read()
            && let Some(hook) = hook.as_ref()
        {
            hook();
        }
        Ok(())
    }
}
