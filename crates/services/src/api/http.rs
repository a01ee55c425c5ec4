use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use learnify_core::model::{
    AttemptId, DocumentId, DocumentSummary, TestAttempt, TestDefinition, TestId, TestStats,
};
use learnify_core::session::SubmitRequest;

use super::auth::{AuthSession, TokenPair, TokenRefresher, call_with_refresh};
use super::wire::{
    AttemptList, DocumentList, GenerateRequest, LoginRequest, LogoutRequest, RefreshRequest,
    SubmitBody, TokenResponse,
};
use super::TestApi;
use crate::config::ApiConfig;
use crate::error::{ApiError, server_message};

/// `TestApi` over the backend's JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
    auth: Arc<AuthSession>,
}

impl HttpApi {
    /// Build a client that authenticates with `auth`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying client cannot be built.
    pub fn new(config: ApiConfig, auth: Arc<AuthSession>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            config,
            auth,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    /// Exchange credentials for a token pair and store it in the session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the server's message on bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let url = self.config.endpoint("users/login/")?;
        let body = LoginRequest { email, password };
        let tokens: TokenResponse = self.execute(Method::POST, url, Some(&body), None).await?;
        self.auth
            .set(TokenPair::new(tokens.access, tokens.refresh.unwrap_or_default()));
        info!("logged in");
        Ok(())
    }

    /// Blacklist the refresh token server-side and forget both tokens.
    ///
    /// The local session is cleared even when the server call fails.
    ///
    /// # Errors
    ///
    /// Returns the error of the logout call, if any.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = match self.auth.refresh_token() {
            Some(refresh) => {
                let body = LogoutRequest {
                    refresh_token: &refresh,
                };
                self.post::<serde_json::Value, _>("users/logout/", &body)
                    .await
                    .map(drop)
            }
            None => Ok(()),
        };
        self.auth.clear();
        result
    }

    /// Documents owned by the current user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the listing fails.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let list: DocumentList = self.get("documents/").await?;
        Ok(list.into_vec())
    }

    async fn get<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        self.authorized::<T, ()>(Method::GET, path, None).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        self.authorized(Method::POST, path, Some(body)).await
    }

    /// Send a bearer-authenticated request, refreshing the token once on 401.
    async fn authorized<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.config.endpoint(path)?;
        call_with_refresh(&self.auth, self, |token| {
            let method = method.clone();
            let url = url.clone();
            async move { self.execute(method, url, body, token.as_deref()).await }
        })
        .await
    }

    async fn execute<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        debug!(%method, %url, "sending request");
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED && token.is_some() {
            debug!(%method, %url, "request unauthorized");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = server_message(&text);
            warn!(%method, %url, %status, message = message.as_deref(), "request failed");
            return Err(ApiError::Status { status, message });
        }

        // 204 responses carry no body.
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }
}

#[async_trait]
impl TokenRefresher for HttpApi {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let url = self.config.endpoint("users/token/refresh/")?;
        let body = RefreshRequest {
            refresh: refresh_token,
        };
        let tokens: TokenResponse = self.execute(Method::POST, url, Some(&body), None).await?;
        let refresh = tokens.refresh.unwrap_or_else(|| refresh_token.to_owned());
        Ok(TokenPair::new(tokens.access, refresh))
    }
}

#[async_trait]
impl TestApi for HttpApi {
    async fn generate(&self, document: DocumentId) -> Result<TestDefinition, ApiError> {
        let body = GenerateRequest {
            document_id: document,
        };
        let test: TestDefinition = self.post("documents/tests/generate/", &body).await?;
        test.ensure_ready()?;
        debug!(test = %test.id, questions = test.len(), "test generated");
        Ok(test)
    }

    async fn get_test(&self, id: TestId) -> Result<TestDefinition, ApiError> {
        self.get(&format!("documents/tests/{id}/")).await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TestAttempt, ApiError> {
        let body = SubmitBody {
            answers: &request.answers,
            time_taken_seconds: request.time_taken_seconds,
        };
        let attempt: TestAttempt = self
            .post(&format!("documents/tests/{}/submit/", request.test_id), &body)
            .await?;
        debug!(attempt = %attempt.id, score = attempt.score, "test submitted");
        Ok(attempt)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, ApiError> {
        self.get(&format!("documents/tests/attempts/{id}/")).await
    }

    async fn list_attempts(
        &self,
        document: Option<DocumentId>,
    ) -> Result<Vec<TestAttempt>, ApiError> {
        let path = match document {
            Some(document) => format!("documents/{document}/test-attempts/"),
            None => "documents/tests/attempts/".to_owned(),
        };
        let list: AttemptList = self.get(&path).await?;
        Ok(list.into_vec())
    }

    async fn delete_test(&self, id: TestId) -> Result<(), ApiError> {
        self.authorized::<(), ()>(Method::DELETE, &format!("documents/tests/{id}/"), None)
            .await
    }

    async fn test_stats(&self) -> Result<TestStats, ApiError> {
        self.get("documents/tests/stats/").await
    }
}
