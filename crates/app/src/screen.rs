//! Plain-text rendering of the test screens and listings.

use chrono::Duration;

use learnify_core::model::{
    DocumentSummary, Grade, OptionLabel, Question, ResultDetail, TestAttempt, TestStats,
};
use learnify_core::session::{Completed, Confirmation, InProgress};
use learnify_core::time::format_elapsed;

const RULE: &str = "────────────────────────────────────────────────────────────";

pub const QUESTION_HELP: &str =
    "a/b/c answer · n next · p previous · g <number> jump · s submit · q quit";

//
// ─── TEST SCREENS ─────────────────────────────────────────────────────────────
//

/// The displayed question with progress, timer, and any error banner.
#[must_use]
pub fn render_question(state: &InProgress, elapsed: &str) -> String {
    let mut lines = vec![
        format!("{}  [{elapsed}]", state.test().title),
        format!(
            "Question {} of {} · {} answered",
            state.current_index() + 1,
            state.total(),
            state.answered()
        ),
        progress_row(state),
        RULE.to_owned(),
    ];

    if let Some(question) = state.current_question() {
        let selected = state.answers().get(question.id);
        lines.push(question.text.clone());
        lines.push(String::new());
        for label in OptionLabel::ALL {
            let marker = if selected == Some(label) { '*' } else { ' ' };
            lines.push(format!(" {marker} ({label}) {}", question.option_text(label)));
        }
    }

    lines.push(RULE.to_owned());
    if let Some(error) = state.error() {
        lines.push(format!("! {error}"));
    }
    lines.push(QUESTION_HELP.to_owned());
    lines.join("\n")
}

/// One cell per question: `[n]` for the current one, `n*` when answered.
fn progress_row(state: &InProgress) -> String {
    state
        .test()
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let number = index + 1;
            if index == state.current_index() {
                format!("[{number}]")
            } else if state.answers().get(question.id).is_some() {
                format!("{number}*")
            } else {
                number.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn confirmation_prompt(confirmation: Confirmation) -> String {
    match confirmation {
        Confirmation::Incomplete { unanswered: 1 } => {
            "1 question is unanswered. Submit anyway? [y/N]".to_owned()
        }
        Confirmation::Incomplete { unanswered } => {
            format!("{unanswered} questions are unanswered. Submit anyway? [y/N]")
        }
        Confirmation::Final => "Submit your answers? This cannot be undone. [y/N]".to_owned(),
    }
}

/// Score summary followed by the per-question review.
#[must_use]
pub fn render_results(completed: &Completed) -> String {
    let attempt = completed.attempt();
    let mut lines = vec![
        format!("Results · {}", completed.test().title),
        RULE.to_owned(),
    ];
    lines.extend(attempt_summary(attempt));
    lines.push(format!(
        "Time taken: {}",
        format_elapsed(Duration::seconds(i64::from(completed.time_taken_seconds())))
    ));
    lines.push(RULE.to_owned());

    for (position, detail) in attempt.results.iter().enumerate() {
        let question = completed.test().questions.iter().find(|q| q.id == detail.question_id);
        lines.extend(review_entry(position + 1, detail, question));
        lines.push(String::new());
    }
    lines.push("r retake · q quit".to_owned());
    lines.join("\n")
}

fn attempt_summary(attempt: &TestAttempt) -> Vec<String> {
    let verdict = if attempt.passed { "PASSED" } else { "FAILED" };
    vec![
        format!(
            "Score: {:.1}%   Grade: {}   {verdict}",
            attempt.score, attempt.grade
        ),
        format!(
            "Correct: {}   Incorrect: {}   Unanswered: {}",
            attempt.correct_count,
            attempt.incorrect_count,
            attempt.unanswered_count()
        ),
    ]
}

fn review_entry(number: usize, detail: &ResultDetail, question: Option<&Question>) -> Vec<String> {
    let option_text = |label: OptionLabel| {
        detail
            .options
            .get(&label)
            .cloned()
            .or_else(|| question.map(|q| q.option_text(label).to_owned()))
            .unwrap_or_default()
    };
    let mark = if detail.is_correct { "✓" } else { "✗" };
    let yours = match detail.user_answer {
        Some(label) => format!("{label}) {}", option_text(label)),
        None => "Not answered".to_owned(),
    };

    let mut lines = vec![
        format!("{number}. {mark} {}", detail.question),
        format!("   Your answer: {yours}"),
    ];
    if !detail.is_correct {
        lines.push(format!(
            "   Correct answer: {}) {}",
            detail.correct_answer,
            option_text(detail.correct_answer)
        ));
    }
    if !detail.explanation.is_empty() {
        lines.push(format!("   {}", detail.explanation));
    }
    lines
}

//
// ─── LISTINGS ─────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn render_documents(documents: &[DocumentSummary]) -> String {
    if documents.is_empty() {
        return "No documents uploaded yet.".to_owned();
    }
    documents
        .iter()
        .map(|doc| {
            let state = if doc.can_generate_test() { "ready" } else { "not ready" };
            format!("{}  {:<9}  {}", doc.id, state, doc.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn render_attempts(attempts: &[TestAttempt]) -> String {
    if attempts.is_empty() {
        return "No test attempts yet.".to_owned();
    }
    attempts
        .iter()
        .map(|attempt| {
            let title = attempt
                .test_title
                .as_deref()
                .or(attempt.document_title.as_deref())
                .unwrap_or("Untitled test");
            format!(
                "{}  {}  {:>5.1}%  {}  {}",
                attempt.id,
                attempt.completed_at.format("%Y-%m-%d %H:%M"),
                attempt.score,
                attempt.grade,
                title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Detail view of a past attempt.
#[must_use]
pub fn render_attempt(attempt: &TestAttempt) -> String {
    let mut lines = vec![
        attempt
            .test_title
            .clone()
            .unwrap_or_else(|| "Test attempt".to_owned()),
        RULE.to_owned(),
    ];
    lines.extend(attempt_summary(attempt));
    if let Some(seconds) = attempt.time_taken_seconds {
        lines.push(format!(
            "Time taken: {}",
            format_elapsed(Duration::seconds(i64::from(seconds)))
        ));
    }
    lines.push(RULE.to_owned());
    for (position, detail) in attempt.results.iter().enumerate() {
        lines.extend(review_entry(position + 1, detail, None));
    }
    lines.join("\n")
}

#[must_use]
pub fn render_stats(stats: &TestStats) -> String {
    if stats.total_tests_taken == 0 {
        return "No tests taken yet.".to_owned();
    }
    let grades = Grade::ALL
        .iter()
        .map(|grade| format!("{grade}: {}", stats.grade_count(*grade)))
        .collect::<Vec<_>>()
        .join("  ");
    [
        format!(
            "Tests taken: {}   Passed: {}   Failed: {}   Pass rate: {:.1}%",
            stats.total_tests_taken, stats.tests_passed, stats.tests_failed, stats.pass_rate
        ),
        format!(
            "Average: {:.1}%   Best: {:.1}%   Worst: {:.1}%",
            stats.average_score, stats.best_score, stats.worst_score
        ),
        format!(
            "Accuracy: {:.1}% ({} of {} answers)",
            stats.accuracy_rate, stats.total_correct_answers, stats.total_questions_answered
        ),
        format!("Grades  {grades}"),
    ]
    .join("\n")
}
