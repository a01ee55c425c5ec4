use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::DocumentId;

/// Processing state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

/// Listing entry for a document owned by the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub file_type: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub is_ready: bool,
    pub created_at: DateTime<Utc>,
}

impl DocumentSummary {
    /// Whether a test can be generated from this document.
    #[must_use]
    pub fn can_generate_test(&self) -> bool {
        self.status == DocumentStatus::Ready && self.is_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_document_can_generate() {
        let json = r#"{
            "id": "6f1c5a34-8a8e-4d36-9d7c-2f1e0b6c1a11",
            "title": "Ownership notes",
            "file_type": "pdf",
            "status": "ready",
            "word_count": 1200,
            "page_count": 3,
            "is_ready": true,
            "created_at": "2025-01-02T03:04:05Z",
            "ai_summary": "ignored"
        }"#;
        let doc: DocumentSummary = serde_json::from_str(json).unwrap();
        assert!(doc.can_generate_test());
    }

    #[test]
    fn processing_document_cannot_generate() {
        let json = r#"{
            "id": "6f1c5a34-8a8e-4d36-9d7c-2f1e0b6c1a11",
            "title": "Draft",
            "status": "processing",
            "created_at": "2025-01-02T03:04:05Z"
        }"#;
        let doc: DocumentSummary = serde_json::from_str(json).unwrap();
        assert!(!doc.can_generate_test());
    }
}
