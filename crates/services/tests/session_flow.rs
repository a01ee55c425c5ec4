use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use reqwest::StatusCode;

use learnify_core::model::{
    AttemptId, DocumentId, Grade, OptionLabel, Question, QuestionId, ResultDetail, TestAttempt,
    DEFAULT_QUESTION_COUNT, TestDefinition, TestId, TestStats, TestStatus,
};
use learnify_core::session::{Confirmation, Rejection, SubmitRequest, TestSession};
use learnify_core::time::fixed_now;
use services::error::{GENERATE_FALLBACK, SUBMIT_FALLBACK};
use services::{ApiError, CallOutcome, Clock, SessionError, TestApi, TestSessionController};

//
// ─── FAKE BACKEND ─────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct FakeState {
    tests: Vec<TestDefinition>,
    submissions: Vec<SubmitRequest>,
    generate_failures: VecDeque<ApiError>,
    submit_failures: VecDeque<ApiError>,
}

#[derive(Default)]
struct FakeApi {
    question_count: u32,
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn with_questions(question_count: u32) -> Arc<Self> {
        Arc::new(Self {
            question_count,
            state: Mutex::default(),
        })
    }

    /// A backend generating the usual number of questions per test.
    fn standard() -> Arc<Self> {
        Self::with_questions(DEFAULT_QUESTION_COUNT as u32)
    }

    fn fail_next_generate(&self, err: ApiError) {
        self.state.lock().unwrap().generate_failures.push_back(err);
    }

    fn fail_next_submit(&self, err: ApiError) {
        self.state.lock().unwrap().submit_failures.push_back(err);
    }

    fn submissions(&self) -> Vec<SubmitRequest> {
        self.state.lock().unwrap().submissions.clone()
    }
}

fn question(id: u32) -> Question {
    Question {
        id: QuestionId::new(id),
        text: format!("Question {id}?"),
        options: OptionLabel::ALL
            .iter()
            .map(|label| (*label, format!("Option {label}")))
            .collect(),
        correct_answer: OptionLabel::A,
        explanation: "A is always right here.".into(),
    }
}

fn build_test(document: DocumentId, count: u32) -> TestDefinition {
    TestDefinition {
        id: TestId::new_v4(),
        document,
        document_title: Some("Ownership notes".into()),
        title: "Practice Test - Ownership notes".into(),
        question_count: count as usize,
        questions: (1..=count).map(question).collect(),
        status: TestStatus::Ready,
        generation_error: None,
        created_at: fixed_now(),
    }
}

fn grade_for(score: f64) -> Grade {
    match score {
        s if s >= 90.0 => Grade::A,
        s if s >= 80.0 => Grade::B,
        s if s >= 70.0 => Grade::C,
        s if s >= 60.0 => Grade::D,
        _ => Grade::F,
    }
}

fn grade(test: &TestDefinition, request: &SubmitRequest) -> TestAttempt {
    let results: Vec<ResultDetail> = test
        .questions
        .iter()
        .map(|q| {
            let user_answer = request.answers.get(q.id);
            ResultDetail {
                question_id: q.id,
                question: q.text.clone(),
                options: q.options.clone(),
                user_answer,
                correct_answer: q.correct_answer,
                is_correct: user_answer == Some(q.correct_answer),
                explanation: q.explanation.clone(),
            }
        })
        .collect();
    let correct = results.iter().filter(|r| r.is_correct).count() as u32;
    let total = results.len() as u32;
    let score = f64::from(correct) * 100.0 / f64::from(total);
    TestAttempt {
        id: AttemptId::new_v4(),
        test: test.id,
        test_title: Some(test.title.clone()),
        document_title: test.document_title.clone(),
        answers: request.answers.clone(),
        score,
        grade: grade_for(score),
        passed: score >= 60.0,
        correct_count: correct,
        incorrect_count: total - correct,
        results,
        time_taken_seconds: Some(request.time_taken_seconds),
        started_at: None,
        completed_at: fixed_now(),
    }
}

#[async_trait]
impl TestApi for FakeApi {
    async fn generate(&self, document: DocumentId) -> Result<TestDefinition, ApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.generate_failures.pop_front() {
            return Err(err);
        }
        let test = build_test(document, self.question_count);
        state.tests.push(test.clone());
        Ok(test)
    }

    async fn get_test(&self, id: TestId) -> Result<TestDefinition, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .tests
            .iter()
            .find(|test| test.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: Some("Not found.".into()),
            })
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TestAttempt, ApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.submit_failures.pop_front() {
            return Err(err);
        }
        let test = state
            .tests
            .iter()
            .find(|test| test.id == request.test_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: None,
            })?;
        state.submissions.push(request.clone());
        Ok(grade(&test, request))
    }

    async fn get_attempt(&self, _id: AttemptId) -> Result<TestAttempt, ApiError> {
        Err(ApiError::Status {
            status: StatusCode::NOT_FOUND,
            message: None,
        })
    }

    async fn list_attempts(
        &self,
        _document: Option<DocumentId>,
    ) -> Result<Vec<TestAttempt>, ApiError> {
        Ok(Vec::new())
    }

    async fn delete_test(&self, id: TestId) -> Result<(), ApiError> {
        self.state.lock().unwrap().tests.retain(|test| test.id != id);
        Ok(())
    }

    async fn test_stats(&self) -> Result<TestStats, ApiError> {
        Ok(TestStats::default())
    }
}

fn controller(api: &Arc<FakeApi>) -> TestSessionController {
    TestSessionController::new(api.clone(), Clock::fixed(fixed_now()))
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: None,
    }
}

//
// ─── FLOWS ────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn full_twenty_question_test() {
    let api = FakeApi::standard();
    let mut ctl = controller(&api);

    let outcome = ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    assert_eq!(outcome, CallOutcome::Succeeded);
    assert_eq!(ctl.elapsed_display(), "00:00");

    for index in 0..DEFAULT_QUESTION_COUNT {
        assert_eq!(ctl.session().current_index(), index);
        ctl.select_current(OptionLabel::A).unwrap();
        if index + 1 < DEFAULT_QUESTION_COUNT {
            ctl.next().unwrap();
        }
    }
    assert!(matches!(ctl.next(), Err(SessionError::Rejected(Rejection::OutOfRange))));

    ctl.clock_mut().advance(Duration::seconds(605));
    assert_eq!(ctl.elapsed_display(), "10:05");

    assert_eq!(ctl.request_submit().unwrap(), Confirmation::Final);
    assert_eq!(ctl.confirm_submit().await.unwrap(), CallOutcome::Succeeded);

    let results = ctl.session().results().unwrap();
    let attempt = results.attempt();
    assert_eq!(attempt.correct_count + attempt.incorrect_count, 20);
    assert_eq!(attempt.correct_count, 20);
    assert_eq!(attempt.grade, Grade::A);
    assert!(attempt.passed);
    assert_eq!(results.time_taken_seconds(), 605);

    // The timer stops once results are in.
    ctl.clock_mut().advance(Duration::seconds(30));
    assert_eq!(ctl.elapsed_display(), "10:05");

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].answers.len(), 20);
    assert_eq!(submissions[0].time_taken_seconds, 605);
}

#[tokio::test]
async fn incomplete_submit_asks_twice_and_can_be_declined() {
    let api = FakeApi::standard();
    let mut ctl = controller(&api);
    ctl.generate_test(DocumentId::new_v4()).await.unwrap();

    for id in 1..=5 {
        ctl.select_answer(QuestionId::new(id), OptionLabel::B).unwrap();
    }

    assert_eq!(
        ctl.request_submit().unwrap(),
        Confirmation::Incomplete { unanswered: 15 }
    );
    // Answers are frozen while a confirmation is open.
    assert!(matches!(
        ctl.select_answer(QuestionId::new(6), OptionLabel::A),
        Err(SessionError::Rejected(Rejection::Busy))
    ));
    ctl.decline_submit().unwrap();

    assert!(api.submissions().is_empty());
    let state = ctl.session().in_progress().unwrap();
    assert_eq!(state.answers().len(), 5);
    assert!(state.confirmation().is_none());

    ctl.request_submit().unwrap();
    ctl.confirm_incomplete().unwrap();
    assert_eq!(
        ctl.session().in_progress().unwrap().confirmation(),
        Some(Confirmation::Final)
    );
    assert_eq!(ctl.confirm_submit().await.unwrap(), CallOutcome::Succeeded);

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].answers.len(), 5);
    let attempt = ctl.session().results().unwrap().attempt();
    assert_eq!(attempt.unanswered_count(), 15);
    assert_eq!(attempt.correct_count, 0);
    assert!(!attempt.passed);
}

#[tokio::test]
async fn submit_failure_keeps_answers_and_retry_succeeds() {
    let api = FakeApi::standard();
    let mut ctl = controller(&api);
    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    for id in 1..=20 {
        ctl.select_answer(QuestionId::new(id), OptionLabel::A).unwrap();
    }

    api.fail_next_submit(ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: None,
    });
    ctl.request_submit().unwrap();
    assert_eq!(ctl.confirm_submit().await.unwrap(), CallOutcome::Failed);

    let state = ctl.session().in_progress().unwrap();
    assert_eq!(state.answers().len(), 20);
    assert!(!state.is_submitting());
    assert_eq!(state.error(), Some(SUBMIT_FALLBACK));

    ctl.dismiss_error().unwrap();
    assert!(ctl.session().error().is_none());

    ctl.request_submit().unwrap();
    assert_eq!(ctl.confirm_submit().await.unwrap(), CallOutcome::Succeeded);
    assert!(ctl.session().is_results());
}

#[tokio::test]
async fn generation_failure_shows_server_message() {
    let api = FakeApi::standard();
    api.fail_next_generate(ApiError::Status {
        status: StatusCode::BAD_REQUEST,
        message: Some("Document is not ready for test generation".into()),
    });
    let mut ctl = controller(&api);

    let outcome = ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    assert_eq!(outcome, CallOutcome::Failed);
    assert!(ctl.session().is_start());
    assert_eq!(
        ctl.session().error(),
        Some("Document is not ready for test generation")
    );
}

#[tokio::test]
async fn generation_failure_without_message_uses_fallback() {
    let api = FakeApi::standard();
    api.fail_next_generate(server_error());
    let mut ctl = controller(&api);

    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    assert_eq!(ctl.session().error(), Some(GENERATE_FALLBACK));
}

#[tokio::test]
async fn retake_returns_to_a_clean_start() {
    let api = FakeApi::with_questions(2);
    let mut ctl = controller(&api);
    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    ctl.select_current(OptionLabel::C).unwrap();
    assert!(matches!(ctl.retake(), Err(SessionError::Rejected(Rejection::WrongScreen))));

    ctl.request_submit().unwrap();
    ctl.confirm_incomplete().unwrap();
    ctl.confirm_submit().await.unwrap();
    assert!(ctl.session().is_results());

    ctl.retake().unwrap();
    assert!(ctl.session().is_start());
    assert!(ctl.session().answers().is_none());
    assert_eq!(ctl.elapsed_display(), "00:00");
}

#[tokio::test]
async fn generating_again_discards_the_running_test() {
    let api = FakeApi::with_questions(4);
    let mut ctl = controller(&api);
    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    ctl.select_current(OptionLabel::A).unwrap();
    ctl.go_to(3).unwrap();

    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    let state = ctl.session().in_progress().unwrap();
    assert!(state.answers().is_empty());
    assert_eq!(state.current_index(), 0);
}

//
// ─── STALE RESPONSES ──────────────────────────────────────────────────────────
//

#[tokio::test]
async fn submit_response_after_close_is_discarded() {
    let api = FakeApi::with_questions(2);
    let mut ctl = controller(&api);
    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    ctl.request_submit().unwrap();
    ctl.confirm_incomplete().unwrap();

    let pending = ctl.begin_submit().unwrap();
    let result = api.submit(pending.request()).await;
    ctl.close();

    assert_eq!(ctl.finish_submit(pending, result), CallOutcome::Stale);
    assert!(ctl.session().is_start());
    assert!(ctl.session().error().is_none());
}

#[tokio::test]
async fn generate_response_for_an_older_request_is_discarded() {
    let api = FakeApi::with_questions(5);
    let mut ctl = controller(&api);

    let first = ctl.begin_generate(DocumentId::new_v4()).unwrap();
    ctl.close();
    let second = ctl.begin_generate(DocumentId::new_v4()).unwrap();

    let late = api.generate(first.document()).await;
    assert_eq!(ctl.finish_generate(first, late), CallOutcome::Stale);
    assert!(matches!(ctl.session(), TestSession::Start(screen) if screen.is_loading()));

    let fresh = api.generate(second.document()).await;
    assert_eq!(ctl.finish_generate(second, fresh), CallOutcome::Succeeded);
    let test = ctl.session().in_progress().unwrap().test();
    assert_eq!(test.document, second.document());
}

#[tokio::test]
async fn second_generate_while_loading_is_rejected() {
    let api = FakeApi::with_questions(5);
    let mut ctl = controller(&api);
    ctl.begin_generate(DocumentId::new_v4()).unwrap();
    assert!(matches!(
        ctl.begin_generate(DocumentId::new_v4()),
        Err(SessionError::Rejected(Rejection::Busy))
    ));
}

//
// ─── ELAPSED TICKER ───────────────────────────────────────────────────────────
//

#[tokio::test(start_paused = true)]
async fn ticker_runs_only_while_in_progress() {
    let api = FakeApi::with_questions(1);
    let mut ctl = controller(&api);
    assert!(ctl.subscribe_elapsed().is_none());

    ctl.generate_test(DocumentId::new_v4()).await.unwrap();
    let mut elapsed = ctl.subscribe_elapsed().unwrap();
    elapsed.changed().await.unwrap();
    assert_eq!(*elapsed.borrow_and_update(), Duration::seconds(1));
    elapsed.changed().await.unwrap();
    assert_eq!(*elapsed.borrow_and_update(), Duration::seconds(2));

    ctl.select_current(OptionLabel::A).unwrap();
    ctl.request_submit().unwrap();
    ctl.confirm_submit().await.unwrap();
    assert!(ctl.session().is_results());
    assert!(ctl.subscribe_elapsed().is_none());
    assert!(elapsed.changed().await.is_err());
}

#[test]
fn controller_works_without_runtime() {
    let api = FakeApi::with_questions(3);
    let mut ctl = controller(&api);
    let pending = ctl.begin_generate(DocumentId::new_v4()).unwrap();
    let test = build_test(pending.document(), 3);
    assert_eq!(ctl.finish_generate(pending, Ok(test)), CallOutcome::Succeeded);
    assert!(ctl.subscribe_elapsed().is_none());
    ctl.select_current(OptionLabel::B).unwrap();
    assert_eq!(ctl.session().answers().unwrap().len(), 1);
}
