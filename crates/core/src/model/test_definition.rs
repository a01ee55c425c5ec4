use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{DocumentId, QuestionId, TestId};
use crate::model::question::{Question, QuestionError};

/// Number of questions the backend generates per test.
pub const DEFAULT_QUESTION_COUNT: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestDefinitionError {
    #[error("test is still generating")]
    StillGenerating,

    #[error("test generation failed: {0}")]
    GenerationFailed(String),

    #[error("test has no questions")]
    NoQuestions,

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Lifecycle of a generated test on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Generating,
    Ready,
    Error,
}

/// A generated set of questions for one document.
///
/// Owned by the backend; the client only ever holds read-only snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: TestId,
    #[serde(alias = "document_id")]
    pub document: DocumentId,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub question_count: usize,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub status: TestStatus,
    #[serde(default)]
    pub generation_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TestDefinition {
    /// Verify the test can be taken: status is ready and every question is
    /// well formed with a unique id.
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError` describing the first problem found.
    pub fn ensure_ready(&self) -> Result<(), TestDefinitionError> {
        match self.status {
            TestStatus::Ready => {}
            TestStatus::Generating => return Err(TestDefinitionError::StillGenerating),
            TestStatus::Error => {
                let reason = self
                    .generation_error
                    .clone()
                    .filter(|msg| !msg.trim().is_empty())
                    .unwrap_or_else(|| "unknown error".into());
                return Err(TestDefinitionError::GenerationFailed(reason));
            }
        }

        if self.questions.is_empty() {
            return Err(TestDefinitionError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !seen.insert(question.id) {
                return Err(TestDefinitionError::DuplicateQuestion(question.id));
            }
            question.validate()?;
        }
        Ok(())
    }

    /// Number of questions actually present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.questions.iter().any(|question| question.id == id)
    }
}
