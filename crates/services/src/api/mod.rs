//! REST client for the study backend.

mod auth;
mod http;
mod wire;

use async_trait::async_trait;

use learnify_core::model::{
    AttemptId, DocumentId, TestAttempt, TestDefinition, TestId, TestStats,
};
use learnify_core::session::SubmitRequest;

use crate::error::ApiError;

pub use auth::{AuthSession, TokenPair, TokenRefresher, call_with_refresh};
pub use http::HttpApi;

/// Test-taking endpoints the session controller depends on.
///
/// Implemented over HTTP by [`HttpApi`]; tests substitute in-memory fakes.
#[async_trait]
pub trait TestApi: Send + Sync {
    /// Generate a new test for a document.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport, status, or decoding failures, or when
    /// the returned test is not ready to be taken.
    async fn generate(&self, document: DocumentId) -> Result<TestDefinition, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the test cannot be fetched.
    async fn get_test(&self, id: TestId) -> Result<TestDefinition, ApiError>;

    /// Submit answers for grading.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the submission is rejected or fails.
    async fn submit(&self, request: &SubmitRequest) -> Result<TestAttempt, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the attempt cannot be fetched.
    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, ApiError>;

    /// Attempts of the current user, optionally limited to one document.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the listing fails.
    async fn list_attempts(
        &self,
        document: Option<DocumentId>,
    ) -> Result<Vec<TestAttempt>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the test cannot be deleted.
    async fn delete_test(&self, id: TestId) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the statistics cannot be fetched.
    async fn test_stats(&self) -> Result<TestStats, ApiError>;
}
