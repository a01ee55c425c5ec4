//! Request and response bodies that only exist on the wire.

use serde::{Deserialize, Serialize};

use learnify_core::model::{AnswerSet, DocumentId, DocumentSummary, TestAttempt};

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest {
    pub document_id: DocumentId,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitBody<'a> {
    pub answers: &'a AnswerSet,
    pub time_taken_seconds: u32,
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access: String,
    /// Only present when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Serialize)]
pub(crate) struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}

/// Document listing. The backend sends `{ "documents": [...], "count": n }`;
/// a bare array or a paginated page is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DocumentList {
    Bare(Vec<DocumentSummary>),
    Wrapped { documents: Vec<DocumentSummary> },
    Paged { results: Vec<DocumentSummary> },
}

impl DocumentList {
    pub fn into_vec(self) -> Vec<DocumentSummary> {
        match self {
            DocumentList::Bare(items)
            | DocumentList::Wrapped { documents: items }
            | DocumentList::Paged { results: items } => items,
        }
    }
}

/// Attempt listing, either a bare array or `{ "attempts": [...], "count": n }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AttemptList {
    Bare(Vec<TestAttempt>),
    Wrapped { attempts: Vec<TestAttempt> },
}

impl AttemptList {
    pub fn into_vec(self) -> Vec<TestAttempt> {
        match self {
            AttemptList::Bare(items) | AttemptList::Wrapped { attempts: items } => items,
        }
    }
}
