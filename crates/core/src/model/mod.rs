mod answers;
mod attempt;
mod document;
mod ids;
mod question;
mod test_definition;

#[cfg(test)]
pub(crate) mod fixtures;

pub use answers::AnswerSet;
pub use attempt::{Grade, ResultDetail, TestAttempt, TestStats};
pub use document::{DocumentStatus, DocumentSummary};
pub use ids::{AttemptId, DocumentId, ParseIdError, QuestionId, TestId};
pub use question::{OptionLabel, ParseOptionLabelError, Question, QuestionError};
pub use test_definition::{
    DEFAULT_QUESTION_COUNT, TestDefinition, TestDefinitionError, TestStatus,
};
