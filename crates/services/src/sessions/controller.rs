use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use learnify_core::model::{DocumentId, OptionLabel, QuestionId, TestAttempt, TestDefinition};
use learnify_core::session::{
    Confirmation, Rejection, SessionEffect, SessionEvent, SubmitRequest, TestSession, Transition,
};
use learnify_core::time::format_elapsed;

use super::ticker::ElapsedTicker;
use crate::Clock;
use crate::api::TestApi;
use crate::error::{ApiError, GENERATE_FALLBACK, SUBMIT_FALLBACK, SessionError};

const TICK_PERIOD: std::time::Duration = std::time::Duration::from_secs(1);

/// Generate call issued by [`TestSessionController::begin_generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingGenerate {
    epoch: u64,
    document: DocumentId,
}

impl PendingGenerate {
    #[must_use]
    pub fn document(&self) -> DocumentId {
        self.document
    }
}

/// Submit call issued by [`TestSessionController::begin_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmit {
    epoch: u64,
    request: SubmitRequest,
}

impl PendingSubmit {
    #[must_use]
    pub fn request(&self) -> &SubmitRequest {
        &self.request
    }
}

/// How a finished network call affected the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Succeeded,
    /// The call failed and an error banner is showing.
    Failed,
    /// The session was reset or closed while the call was in flight.
    Stale,
}

/// Drives a [`TestSession`] against the backend.
///
/// Each reset or close bumps an epoch; responses that belong to an older
/// epoch are dropped without touching the session.
pub struct TestSessionController {
    clock: Clock,
    api: Arc<dyn TestApi>,
    session: TestSession,
    epoch: u64,
    ticker: Option<ElapsedTicker>,
    tick_period: std::time::Duration,
}

impl TestSessionController {
    #[must_use]
    pub fn new(api: Arc<dyn TestApi>, clock: Clock) -> Self {
        Self {
            clock,
            api,
            session: TestSession::new(),
            epoch: 0,
            ticker: None,
            tick_period: TICK_PERIOD,
        }
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: std::time::Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn TestApi> {
        &self.api
    }

    /// Mutable access to the clock, for advancing fixed clocks in tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    //
    // ─── GENERATION ───────────────────────────────────────────────────────────
    //

    /// Generate a test for `document` and start it.
    ///
    /// Any running or finished session is discarded first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` if a generation is already in flight.
    /// Network failures are reported through the session's error banner.
    pub async fn generate_test(&mut self, document: DocumentId) -> Result<CallOutcome, SessionError> {
        let pending = self.begin_generate(document)?;
        let result = self.api.generate(pending.document).await;
        Ok(self.finish_generate(pending, result))
    }

    /// Put the start screen into its loading state and hand back the call to make.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` if a generation is already in flight.
    pub fn begin_generate(&mut self, document: DocumentId) -> Result<PendingGenerate, SessionError> {
        if !self.session.is_start() {
            self.reset();
        }
        match self.dispatch(SessionEvent::GenerateRequested(document))? {
            Some(SessionEffect::Generate(document)) => {
                debug!(%document, "generating test");
                Ok(PendingGenerate {
                    epoch: self.epoch,
                    document,
                })
            }
            _ => Err(SessionError::Rejected(Rejection::WrongScreen)),
        }
    }

    /// Apply the result of a generate call.
    pub fn finish_generate(
        &mut self,
        pending: PendingGenerate,
        result: Result<TestDefinition, ApiError>,
    ) -> CallOutcome {
        if pending.epoch != self.epoch {
            info!(document = %pending.document, "discarding stale generate response");
            return CallOutcome::Stale;
        }
        let event = match result {
            Ok(test) => SessionEvent::GenerationSucceeded {
                test,
                at: self.clock.now(),
            },
            Err(err) => {
                warn!(document = %pending.document, error = %err, "test generation failed");
                SessionEvent::GenerationFailed {
                    message: err.user_message(GENERATE_FALLBACK),
                }
            }
        };
        if self.dispatch(event).is_err() {
            return CallOutcome::Stale;
        }
        if self.session.is_in_progress() {
            CallOutcome::Succeeded
        } else {
            CallOutcome::Failed
        }
    }

    //
    // ─── ANSWERING ────────────────────────────────────────────────────────────
    //

    /// Record `label` as the answer to `question`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` outside a running test, while a
    /// confirmation or submission is pending, or for an unknown question.
    pub fn select_answer(&mut self, question: QuestionId, label: OptionLabel) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::AnswerSelected { question, label })
            .map(drop)
    }

    /// Answer the displayed question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestion` when no question is displayed, or
    /// the rejection from [`Self::select_answer`].
    pub fn select_current(&mut self, label: OptionLabel) -> Result<(), SessionError> {
        let question = self
            .session
            .in_progress()
            .and_then(|state| state.current_question())
            .map(|question| question.id)
            .ok_or(SessionError::NoQuestion)?;
        self.select_answer(question, label)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Rejected` when `index` is out of range.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::GoTo(index)).map(drop)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Rejected` on the last question.
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::Next).map(drop)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Rejected` on the first question.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::Previous).map(drop)
    }

    //
    // ─── SUBMISSION ───────────────────────────────────────────────────────────
    //

    /// Ask to submit and return the confirmation the user must answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` outside a running test or while
    /// a submission is in flight.
    pub fn request_submit(&mut self) -> Result<Confirmation, SessionError> {
        self.dispatch(SessionEvent::SubmitRequested)?;
        self.session
            .in_progress()
            .and_then(|state| state.confirmation())
            .ok_or(SessionError::Rejected(Rejection::NoConfirmation))
    }

    /// Accept submitting with unanswered questions; the final confirmation follows.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` if no incomplete-submit confirmation is pending.
    pub fn confirm_incomplete(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::ConfirmIncomplete).map(drop)
    }

    /// Back out of a pending confirmation; answers are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` if nothing is pending.
    pub fn decline_submit(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::DeclineSubmit).map(drop)
    }

    /// Confirm the final submit and send the answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` if the final confirmation is not
    /// pending. Network failures are reported through the error banner.
    pub async fn confirm_submit(&mut self) -> Result<CallOutcome, SessionError> {
        let pending = self.begin_submit()?;
        let result = self.api.submit(&pending.request).await;
        Ok(self.finish_submit(pending, result))
    }

    /// Capture the time taken and hand back the submit call to make.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` if the final confirmation is not pending.
    pub fn begin_submit(&mut self) -> Result<PendingSubmit, SessionError> {
        let at = self.clock.now();
        match self.dispatch(SessionEvent::ConfirmFinal { at })? {
            Some(SessionEffect::Submit(request)) => {
                debug!(
                    test = %request.test_id,
                    answered = request.answers.len(),
                    time_taken_seconds = request.time_taken_seconds,
                    "submitting test"
                );
                Ok(PendingSubmit {
                    epoch: self.epoch,
                    request,
                })
            }
            _ => Err(SessionError::Rejected(Rejection::WrongScreen)),
        }
    }

    /// Apply the result of a submit call.
    pub fn finish_submit(
        &mut self,
        pending: PendingSubmit,
        result: Result<TestAttempt, ApiError>,
    ) -> CallOutcome {
        if pending.epoch != self.epoch {
            info!(test = %pending.request.test_id, "discarding stale submit response");
            return CallOutcome::Stale;
        }
        let (event, outcome) = match result {
            Ok(attempt) => (
                SessionEvent::SubmitSucceeded(Box::new(attempt)),
                CallOutcome::Succeeded,
            ),
            Err(err) => {
                warn!(test = %pending.request.test_id, error = %err, "test submission failed");
                (
                    SessionEvent::SubmitFailed {
                        message: err.user_message(SUBMIT_FALLBACK),
                    },
                    CallOutcome::Failed,
                )
            }
        };
        match self.dispatch(event) {
            Ok(_) => outcome,
            Err(_) => CallOutcome::Stale,
        }
    }

    //
    // ─── LIFECYCLE ────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `SessionError::Rejected` when no error is showing.
    pub fn dismiss_error(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::DismissError).map(drop)
    }

    /// Leave the results screen for a fresh start screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` outside the results screen.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        self.dispatch(SessionEvent::Retake)?;
        self.epoch += 1;
        Ok(())
    }

    /// Tear the session down. Responses still in flight will be discarded.
    pub fn close(&mut self) {
        debug!("closing test session");
        self.reset();
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.session.elapsed(self.clock.now())
    }

    /// Elapsed time as `MM:SS`.
    #[must_use]
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed())
    }

    /// Live elapsed time while a test is running.
    ///
    /// `None` when no test is in progress or there is no tokio runtime.
    #[must_use]
    pub fn subscribe_elapsed(&self) -> Option<watch::Receiver<Duration>> {
        self.ticker.as_ref().map(ElapsedTicker::subscribe)
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.session = TestSession::new();
        self.ticker = None;
    }

    fn dispatch(&mut self, event: SessionEvent) -> Result<Option<SessionEffect>, SessionError> {
        let Transition {
            session,
            effect,
            rejected,
        } = std::mem::take(&mut self.session).apply(event);
        self.session = session;
        self.sync_ticker();

        match rejected {
            Some(reason) => {
                debug!(?reason, "session event rejected");
                Err(SessionError::Rejected(reason))
            }
            None => Ok(effect),
        }
    }

    fn sync_ticker(&mut self) {
        if !self.session.is_in_progress() {
            self.ticker = None;
        } else if self.ticker.is_none() {
            self.ticker = ElapsedTicker::spawn(self.elapsed(), self.tick_period);
        }
    }
}
