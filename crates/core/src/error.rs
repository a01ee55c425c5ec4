use thiserror::Error;

use crate::model::{ParseIdError, ParseOptionLabelError, QuestionError, TestDefinitionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    ParseOptionLabel(#[from] ParseOptionLabelError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    TestDefinition(#[from] TestDefinitionError),
}
