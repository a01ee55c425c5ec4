//! Shared error types for the services crate.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use learnify_core::model::TestDefinitionError;
use learnify_core::session::Rejection;

/// Fallback shown when test generation fails without a usable server message.
pub const GENERATE_FALLBACK: &str = "Failed to generate test. Please try again.";
/// Fallback shown when submission fails without a usable server message.
pub const SUBMIT_FALLBACK: &str = "Failed to submit test. Please try again.";
/// Fallback for any other request.
pub const GENERIC_FALLBACK: &str = "Something went wrong. Please try again.";

const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Errors emitted by the REST client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("request failed with status {status}")]
    Status {
        status: StatusCode,
        /// Message extracted from the error body, if the server sent one.
        message: Option<String>,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidTest(#[from] TestDefinitionError),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Human-readable message for a banner.
    ///
    /// Prefers what the server said (its `error` field, then `detail`), then
    /// `fallback`. Never empty as long as `fallback` is not.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::Unauthorized => SESSION_EXPIRED.to_owned(),
            ApiError::InvalidTest(TestDefinitionError::GenerationFailed(reason)) => reason.clone(),
            _ => fallback.to_owned(),
        }
    }
}

/// Errors from loading client configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid API base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        source: url::ParseError,
    },
    #[error("API base url must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("invalid {name} value: {raw:?}")]
    InvalidNumber { name: &'static str, raw: String },
}

/// Errors emitted by the test session controller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("action not available: {0:?}")]
    Rejected(Rejection),
    #[error("no question is displayed")]
    NoQuestion,
}

//
// ─── ERROR BODIES ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    detail: Option<Value>,
}

/// Pull a displayable message out of an error response body.
///
/// `error` wins over `detail`. Validation errors arrive as an object of
/// field -> messages and are flattened to `field: message` pairs.
#[must_use]
pub fn server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .as_ref()
        .and_then(flatten)
        .or_else(|| parsed.detail.as_ref().and_then(flatten))
}

fn flatten(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(text) => text.trim().to_owned(),
        Value::Array(items) => items
            .iter()
            .filter_map(flatten)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(fields) => fields
            .iter()
            .filter_map(|(field, messages)| {
                flatten(messages).map(|message| {
                    if field == "non_field_errors" {
                        message
                    } else {
                        format!("{field}: {message}")
                    }
                })
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    };
    if text.is_empty() { None } else { Some(text) }
}
