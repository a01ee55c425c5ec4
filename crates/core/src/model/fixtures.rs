//! Builders shared by unit tests across the crate.

use crate::model::{
    AttemptId, DocumentId, Grade, OptionLabel, Question, QuestionId, ResultDetail, TestAttempt,
    TestDefinition, TestId, TestStatus,
};
use crate::session::SubmitRequest;
use crate::time::fixed_now;

pub(crate) fn question(id: u32) -> Question {
    Question {
        id: QuestionId::new(id),
        text: format!("Question {id}?"),
        options: OptionLabel::ALL
            .iter()
            .map(|label| (*label, format!("Option {label} of {id}")))
            .collect(),
        correct_answer: OptionLabel::A,
        explanation: format!("A is correct for {id}."),
    }
}

pub(crate) fn ready_test(count: u32) -> TestDefinition {
    TestDefinition {
        id: TestId::new_v4(),
        document: DocumentId::new_v4(),
        document_title: Some("Fixture document".into()),
        title: "Practice Test - Fixture document".into(),
        question_count: count as usize,
        questions: (1..=count).map(question).collect(),
        status: TestStatus::Ready,
        generation_error: None,
        created_at: fixed_now(),
    }
}

/// Attempt for `request` where the first `correct` questions are right and the
/// rest of a 20-question test are wrong.
pub(crate) fn graded_attempt(request: &SubmitRequest, correct: u32) -> TestAttempt {
    let total = 20_u32;
    let results = (1..=total)
        .map(|id| ResultDetail {
            question_id: QuestionId::new(id),
            question: format!("Question {id}?"),
            options: question(id).options,
            user_answer: request.answers.get(QuestionId::new(id)),
            correct_answer: OptionLabel::A,
            is_correct: id <= correct,
            explanation: String::new(),
        })
        .collect();
    TestAttempt {
        id: AttemptId::new_v4(),
        test: request.test_id,
        test_title: None,
        document_title: None,
        answers: request.answers.clone(),
        score: f64::from(correct) * 100.0 / f64::from(total),
        grade: Grade::B,
        passed: true,
        correct_count: correct,
        incorrect_count: total - correct,
        results,
        time_taken_seconds: Some(request.time_taken_seconds),
        started_at: None,
        completed_at: fixed_now(),
    }
}
