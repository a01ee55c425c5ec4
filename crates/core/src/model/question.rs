use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── OPTION LABEL ─────────────────────────────────────────────────────────────
//

/// Label of one of the three answer options of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
}

impl OptionLabel {
    /// Every label, in display order.
    pub const ALL: [OptionLabel; 3] = [OptionLabel::A, OptionLabel::B, OptionLabel::C];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("option label must be A, B or C, got {0:?}")]
pub struct ParseOptionLabelError(pub String);

impl FromStr for OptionLabel {
    type Err = ParseOptionLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(OptionLabel::A),
            "B" | "b" => Ok(OptionLabel::B),
            "C" | "c" => Ok(OptionLabel::C),
            other => Err(ParseOptionLabelError(other.to_owned())),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id}: missing option {label}")]
    MissingOption { id: QuestionId, label: OptionLabel },

    #[error("question {id}: option {label} is empty")]
    EmptyOption { id: QuestionId, label: OptionLabel },

    #[error("question {id}: question text is empty")]
    EmptyText { id: QuestionId },

    #[error("question {id}: explanation is empty")]
    EmptyExplanation { id: QuestionId },
}

/// A single multiple-choice question as delivered by the backend.
///
/// The correct answer and explanation travel with the question; they are
/// only shown on the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "question")]
    pub text: String,
    pub options: BTreeMap<OptionLabel, String>,
    pub correct_answer: OptionLabel,
    pub explanation: String,
}

impl Question {
    /// Check that every option is present and that the texts are usable.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` found.
    pub fn validate(&self) -> Result<(), QuestionError> {
        let id = self.id;
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText { id });
        }
        for label in OptionLabel::ALL {
            match self.options.get(&label) {
                None => return Err(QuestionError::MissingOption { id, label }),
                Some(text) if text.trim().is_empty() => {
                    return Err(QuestionError::EmptyOption { id, label });
                }
                Some(_) => {}
            }
        }
        if self.explanation.trim().is_empty() {
            return Err(QuestionError::EmptyExplanation { id });
        }
        Ok(())
    }

    /// Text of the given option, or an empty string when absent.
    #[must_use]
    pub fn option_text(&self, label: OptionLabel) -> &str {
        self.options.get(&label).map_or("", String::as_str)
    }
}
