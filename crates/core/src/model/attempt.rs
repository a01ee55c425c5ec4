use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::answers::AnswerSet;
use crate::model::ids::{AttemptId, QuestionId, TestId};
use crate::model::question::OptionLabel;

//
// ─── GRADE ────────────────────────────────────────────────────────────────────
//

/// Letter grade assigned by the backend when grading an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RESULT DETAIL ────────────────────────────────────────────────────────────
//

/// Per-question breakdown of a graded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDetail {
    #[serde(alias = "id")]
    pub question_id: QuestionId,
    pub question: String,
    #[serde(default)]
    pub options: BTreeMap<OptionLabel, String>,
    /// `None` when the question was left unanswered.
    #[serde(default, deserialize_with = "optional_label")]
    pub user_answer: Option<OptionLabel>,
    pub correct_answer: OptionLabel,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: String,
}

impl ResultDetail {
    #[must_use]
    pub fn was_answered(&self) -> bool {
        self.user_answer.is_some()
    }
}

/// Accepts a label, `null`, or an empty string (the backend uses both for "no answer").
fn optional_label<'de, D>(deserializer: D) -> Result<Option<OptionLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<OptionLabel>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// The graded, persisted outcome of one submitted answer set.
///
/// Score, grade and pass flag come from the backend and are displayed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAttempt {
    pub id: AttemptId,
    #[serde(alias = "test_id")]
    pub test: TestId,
    #[serde(default)]
    pub test_title: Option<String>,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub answers: AnswerSet,
    pub score: f64,
    pub grade: Grade,
    pub passed: bool,
    pub correct_count: u32,
    pub incorrect_count: u32,
    #[serde(default)]
    pub results: Vec<ResultDetail>,
    #[serde(default)]
    pub time_taken_seconds: Option<u32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

impl TestAttempt {
    /// Number of graded questions (correct plus incorrect).
    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.correct_count.saturating_add(self.incorrect_count)
    }

    /// Questions in the breakdown that were left unanswered.
    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.results.iter().filter(|detail| !detail.was_answered()).count()
    }
}

//
// ─── STATS ────────────────────────────────────────────────────────────────────
//

/// Aggregate performance across all of a user's attempts.
///
/// The backend omits several keys when there are no attempts yet, so every
/// field defaults to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestStats {
    pub total_tests_taken: u32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub pass_rate: f64,
    pub average_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub total_questions_answered: u32,
    pub total_correct_answers: u32,
    pub accuracy_rate: f64,
    pub grade_distribution: BTreeMap<Grade, u32>,
}

impl TestStats {
    #[must_use]
    pub fn grade_count(&self, grade: Grade) -> u32 {
        self.grade_distribution.get(&grade).copied().unwrap_or(0)
    }
}
