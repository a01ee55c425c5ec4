use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::OptionLabel;

/// The user's chosen option per question.
///
/// Serializes as a JSON object keyed by the question id as a string
/// (`{"1": "A", "2": "C"}`), which is the shape the submit endpoint expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<QuestionId, OptionLabel>);

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `label` for `question`. Returns `true` when the set changed.
    pub fn select(&mut self, question: QuestionId, label: OptionLabel) -> bool {
        self.0.insert(question, label) != Some(label)
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<OptionLabel> {
        self.0.get(&question).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// How many of `total` questions have no answer yet.
    #[must_use]
    pub fn unanswered(&self, total: usize) -> usize {
        total.saturating_sub(self.0.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, OptionLabel)> + '_ {
        self.0.iter().map(|(id, label)| (*id, *label))
    }
}

impl FromIterator<(QuestionId, OptionLabel)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, OptionLabel)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
