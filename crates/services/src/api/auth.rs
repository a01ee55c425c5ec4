//! Bearer-token session and the refresh-and-replay decorator.

use std::fmt;
use std::future::Future;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ApiError;

/// Access/refresh token pair issued at login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

/// Explicit holder for the current user's tokens.
///
/// Passed to the client instead of living in global storage, so tests can
/// build as many independent sessions as they need.
#[derive(Default)]
pub struct AuthSession {
    tokens: RwLock<Option<TokenPair>>,
}

impl AuthSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read().map(|tokens| tokens.access)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read()
            .map(|tokens| tokens.refresh)
            .filter(|refresh| !refresh.is_empty())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn set(&self, tokens: TokenPair) {
        *self.tokens.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tokens);
    }

    pub fn clear(&self) {
        *self.tokens.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn read(&self) -> Option<TokenPair> {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Exchanges a refresh token for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` when the refresh token is rejected or the call fails.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}

/// Run `call` with the current access token, refreshing once on 401.
///
/// On `Unauthorized` the refresh token is exchanged and `call` is replayed
/// exactly once with the new access token. A second 401, a missing refresh
/// token, or a failed refresh clears the session and yields `Unauthorized`.
///
/// # Errors
///
/// Returns whatever `call` returns, or `ApiError::Unauthorized` as above.
pub async fn call_with_refresh<T, F, Fut>(
    auth: &AuthSession,
    refresher: &dyn TokenRefresher,
    mut call: F,
) -> Result<T, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    match call(auth.access_token()).await {
        Err(ApiError::Unauthorized) => {}
        other => return other,
    }

    let Some(refresh_token) = auth.refresh_token() else {
        auth.clear();
        return Err(ApiError::Unauthorized);
    };

    info!("access token rejected, refreshing");
    match refresher.refresh(&refresh_token).await {
        Ok(tokens) => auth.set(tokens),
        Err(err) => {
            warn!(error = %err, "token refresh failed");
            auth.clear();
            return Err(ApiError::Unauthorized);
        }
    }

    let replay = call(auth.access_token()).await;
    if matches!(replay, Err(ApiError::Unauthorized)) {
        warn!("request still unauthorized after refresh");
        auth.clear();
    }
    replay
}
