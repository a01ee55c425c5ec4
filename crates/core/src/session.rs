//! Test-taking state machine.
//!
//! A session moves through three screens: `Start` (pick a document and
//! generate a test), `InProgress` (answer and navigate questions), and
//! `Results` (review the graded attempt). Transitions are pure: `apply`
//! consumes the current session and an event and returns the next session
//! plus at most one effect for the caller to perform (a network call).
//! Wall-clock instants travel inside the events so the machine itself never
//! reads time.

use chrono::{DateTime, Duration, Utc};

use crate::model::{
    AnswerSet, DocumentId, OptionLabel, Question, QuestionId, TestAttempt, TestDefinition, TestId,
};
use crate::time::seconds_between;

//
// ─── SCREENS ──────────────────────────────────────────────────────────────────
//

/// Start screen, optionally waiting for a test to be generated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartScreen {
    loading: bool,
    error: Option<String>,
}

impl StartScreen {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Pending submit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Some questions are unanswered; the user must accept submitting anyway.
    Incomplete { unanswered: usize },
    /// Last chance before the irreversible submit.
    Final,
}

/// A test being answered.
#[derive(Debug, Clone, PartialEq)]
pub struct InProgress {
    test: TestDefinition,
    answers: AnswerSet,
    current: usize,
    started_at: DateTime<Utc>,
    confirmation: Option<Confirmation>,
    /// Time taken captured at final confirmation; `Some` while submitting.
    submitting: Option<u32>,
    error: Option<String>,
}

impl InProgress {
    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.test.question(self.current)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn confirmation(&self) -> Option<Confirmation> {
        self.confirmation
    }

    /// True while a submit call is outstanding; the submit control is disabled.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.is_some()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.test.len()
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.answers.unanswered(self.test.len())
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.test.len()
    }
}

/// A graded attempt; the answers and test are frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    test: TestDefinition,
    answers: AnswerSet,
    attempt: TestAttempt,
    time_taken_seconds: u32,
}

impl Completed {
    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn attempt(&self) -> &TestAttempt {
        &self.attempt
    }

    #[must_use]
    pub fn time_taken_seconds(&self) -> u32 {
        self.time_taken_seconds
    }
}

//
// ─── EVENTS & EFFECTS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    GenerateRequested(DocumentId),
    GenerationSucceeded {
        test: TestDefinition,
        at: DateTime<Utc>,
    },
    GenerationFailed {
        message: String,
    },
    AnswerSelected {
        question: QuestionId,
        label: OptionLabel,
    },
    GoTo(usize),
    Next,
    Previous,
    SubmitRequested,
    ConfirmIncomplete,
    ConfirmFinal {
        at: DateTime<Utc>,
    },
    DeclineSubmit,
    SubmitSucceeded(Box<TestAttempt>),
    SubmitFailed {
        message: String,
    },
    DismissError,
    Retake,
}

/// Payload of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub test_id: TestId,
    pub answers: AnswerSet,
    pub time_taken_seconds: u32,
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    Generate(DocumentId),
    Submit(SubmitRequest),
}

/// Why an event left the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The event has no meaning on the current screen.
    WrongScreen,
    /// A generate or submit call is already outstanding.
    Busy,
    /// Navigation target outside the question range.
    OutOfRange,
    /// Answer for a question that is not part of the test.
    UnknownQuestion,
    /// A confirmation step was answered without being asked.
    NoConfirmation,
    /// Nothing to dismiss.
    NoError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: TestSession,
    pub effect: Option<SessionEffect>,
    pub rejected: Option<Rejection>,
}

impl Transition {
    fn applied(session: TestSession) -> Self {
        Self {
            session,
            effect: None,
            rejected: None,
        }
    }

    fn with_effect(session: TestSession, effect: SessionEffect) -> Self {
        Self {
            session,
            effect: Some(effect),
            rejected: None,
        }
    }

    fn rejected(session: TestSession, reason: Rejection) -> Self {
        Self {
            session,
            effect: None,
            rejected: Some(reason),
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.rejected.is_none()
    }
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub enum TestSession {
    Start(StartScreen),
    InProgress(InProgress),
    Results(Completed),
}

impl Default for TestSession {
    fn default() -> Self {
        Self::Start(StartScreen::default())
    }
}

impl TestSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start(_))
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }

    #[must_use]
    pub fn is_results(&self) -> bool {
        matches!(self, Self::Results(_))
    }

    #[must_use]
    pub fn in_progress(&self) -> Option<&InProgress> {
        match self {
            Self::InProgress(state) => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn results(&self) -> Option<&Completed> {
        match self {
            Self::Results(state) => Some(state),
            _ => None,
        }
    }

    /// Answers of the running or completed session (empty on the start screen).
    #[must_use]
    pub fn answers(&self) -> Option<&AnswerSet> {
        match self {
            Self::Start(_) => None,
            Self::InProgress(state) => Some(&state.answers),
            Self::Results(state) => Some(&state.answers),
        }
    }

    /// Index of the displayed question; 0 outside of `InProgress`.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.in_progress().map_or(0, InProgress::current_index)
    }

    /// Banner message for the current screen, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Start(state) => state.error(),
            Self::InProgress(state) => state.error(),
            Self::Results(_) => None,
        }
    }

    /// Elapsed time shown to the user.
    ///
    /// Zero on the start screen, running while in progress, and the captured
    /// time taken once results are in.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Self::Start(_) => Duration::zero(),
            Self::InProgress(state) => Duration::seconds(i64::from(seconds_between(
                state.started_at,
                now,
            ))),
            Self::Results(state) => Duration::seconds(i64::from(state.time_taken_seconds)),
        }
    }

    /// Apply `event` and return the next session.
    #[must_use]
    pub fn apply(self, event: SessionEvent) -> Transition {
        match self {
            Self::Start(state) => apply_start(state, event),
            Self::InProgress(state) => apply_in_progress(state, event),
            Self::Results(state) => apply_results(state, event),
        }
    }
}

fn apply_start(mut state: StartScreen, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::GenerateRequested(document) => {
            if state.loading {
                return Transition::rejected(TestSession::Start(state), Rejection::Busy);
            }
            state.loading = true;
            state.error = None;
            Transition::with_effect(TestSession::Start(state), SessionEffect::Generate(document))
        }
        SessionEvent::GenerationSucceeded { test, at } => {
            if !state.loading {
                return Transition::rejected(TestSession::Start(state), Rejection::WrongScreen);
            }
            if let Err(err) = test.ensure_ready() {
                state.loading = false;
                state.error = Some(err.to_string());
                return Transition::applied(TestSession::Start(state));
            }
            Transition::applied(TestSession::InProgress(InProgress {
                test,
                answers: AnswerSet::new(),
                current: 0,
                started_at: at,
                confirmation: None,
                submitting: None,
                error: None,
            }))
        }
        SessionEvent::GenerationFailed { message } => {
            if !state.loading {
                return Transition::rejected(TestSession::Start(state), Rejection::WrongScreen);
            }
            state.loading = false;
            state.error = Some(message);
            Transition::applied(TestSession::Start(state))
        }
        SessionEvent::DismissError => {
            if state.error.take().is_none() {
                return Transition::rejected(TestSession::Start(state), Rejection::NoError);
            }
            Transition::applied(TestSession::Start(state))
        }
        _ => Transition::rejected(TestSession::Start(state), Rejection::WrongScreen),
    }
}

fn apply_in_progress(mut state: InProgress, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::AnswerSelected { question, label } => {
            if state.submitting.is_some() || state.confirmation.is_some() {
                return Transition::rejected(TestSession::InProgress(state), Rejection::Busy);
            }
            if !state.test.contains(question) {
                return Transition::rejected(
                    TestSession::InProgress(state),
                    Rejection::UnknownQuestion,
                );
            }
            state.answers.select(question, label);
            Transition::applied(TestSession::InProgress(state))
        }
        SessionEvent::GoTo(index) => navigate(state, Some(index)),
        SessionEvent::Next => {
            let target = state.current.checked_add(1);
            navigate(state, target)
        }
        SessionEvent::Previous => {
            let target = state.current.checked_sub(1);
            navigate(state, target)
        }
        SessionEvent::SubmitRequested => {
            if state.submitting.is_some() {
                return Transition::rejected(TestSession::InProgress(state), Rejection::Busy);
            }
            let unanswered = state.unanswered();
            state.confirmation = Some(if unanswered > 0 {
                Confirmation::Incomplete { unanswered }
            } else {
                Confirmation::Final
            });
            Transition::applied(TestSession::InProgress(state))
        }
        SessionEvent::ConfirmIncomplete => match state.confirmation {
            Some(Confirmation::Incomplete { .. }) => {
                state.confirmation = Some(Confirmation::Final);
                Transition::applied(TestSession::InProgress(state))
            }
            _ => Transition::rejected(TestSession::InProgress(state), Rejection::NoConfirmation),
        },
        SessionEvent::ConfirmFinal { at } => {
            if state.submitting.is_some() {
                return Transition::rejected(TestSession::InProgress(state), Rejection::Busy);
            }
            if state.confirmation != Some(Confirmation::Final) {
                return Transition::rejected(
                    TestSession::InProgress(state),
                    Rejection::NoConfirmation,
                );
            }
            let time_taken_seconds = seconds_between(state.started_at, at);
            state.confirmation = None;
            state.submitting = Some(time_taken_seconds);
            state.error = None;
            let request = SubmitRequest {
                test_id: state.test.id,
                answers: state.answers.clone(),
                time_taken_seconds,
            };
            Transition::with_effect(
                TestSession::InProgress(state),
                SessionEffect::Submit(request),
            )
        }
        SessionEvent::DeclineSubmit => {
            if state.confirmation.take().is_none() {
                return Transition::rejected(
                    TestSession::InProgress(state),
                    Rejection::NoConfirmation,
                );
            }
            Transition::applied(TestSession::InProgress(state))
        }
        SessionEvent::SubmitSucceeded(attempt) => {
            let Some(time_taken_seconds) = state.submitting else {
                return Transition::rejected(TestSession::InProgress(state), Rejection::WrongScreen);
            };
            Transition::applied(TestSession::Results(Completed {
                test: state.test,
                answers: state.answers,
                attempt: *attempt,
                time_taken_seconds,
            }))
        }
        SessionEvent::SubmitFailed { message } => {
            if state.submitting.is_none() {
                return Transition::rejected(TestSession::InProgress(state), Rejection::WrongScreen);
            }
            state.submitting = None;
            state.error = Some(message);
            Transition::applied(TestSession::InProgress(state))
        }
        SessionEvent::DismissError => {
            if state.error.take().is_none() {
                return Transition::rejected(TestSession::InProgress(state), Rejection::NoError);
            }
            Transition::applied(TestSession::InProgress(state))
        }
        _ => Transition::rejected(TestSession::InProgress(state), Rejection::WrongScreen),
    }
}

fn navigate(mut state: InProgress, target: Option<usize>) -> Transition {
    match target {
        Some(index) if index < state.test.len() => {
            state.current = index;
            Transition::applied(TestSession::InProgress(state))
        }
        _ => Transition::rejected(TestSession::InProgress(state), Rejection::OutOfRange),
    }
}

fn apply_results(state: Completed, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::Retake => Transition::applied(TestSession::default()),
        _ => Transition::rejected(TestSession::Results(state), Rejection::WrongScreen),
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//
