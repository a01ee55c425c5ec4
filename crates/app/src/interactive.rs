//! Line-oriented terminal loop for taking a test.

use chrono::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tracing::debug;

use learnify_core::model::{DEFAULT_QUESTION_COUNT, DocumentId, OptionLabel};
use learnify_core::session::Confirmation;
use services::{CallOutcome, SessionError, TestSessionController};

use crate::AppError;
use crate::screen::{QUESTION_HELP, confirmation_prompt, render_question, render_results};

/// One line of user input on the question screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(OptionLabel),
    Next,
    Previous,
    /// Zero-based question index.
    GoTo(usize),
    Submit,
    Quit,
    Help,
    Unknown(String),
}

#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Input::Help;
    };
    match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "s" | "submit" => Input::Submit,
        "q" | "quit" => Input::Quit,
        "?" | "h" | "help" => Input::Help,
        "g" | "go" => match parts.next().and_then(|raw| raw.parse::<usize>().ok()) {
            Some(number) if number > 0 => Input::GoTo(number - 1),
            _ => Input::Unknown(line.to_owned()),
        },
        other => match other.parse::<OptionLabel>() {
            Ok(label) => Input::Answer(label),
            Err(_) => Input::Unknown(line.to_owned()),
        },
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub struct Terminal<R = BufReader<Stdin>> {
    lines: Lines<R>,
}

impl Terminal {
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Terminal<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        Ok(self.lines.next_line().await?)
    }

    async fn ask(&mut self, prompt: &str) -> Result<bool, AppError> {
        println!("{prompt}");
        Ok(self.read_line().await?.is_some_and(|line| is_yes(&line)))
    }
}

enum Finish {
    Quit,
    Retake,
}

/// Generate tests for `document` and run them until the user quits.
///
/// A failed generation leaves the start screen up and offers another try.
///
/// # Errors
///
/// Returns `AppError::Io` if stdin cannot be read.
pub async fn take_test<R: AsyncBufRead + Unpin>(
    controller: &mut TestSessionController,
    terminal: &mut Terminal<R>,
    document: DocumentId,
) -> Result<(), AppError> {
    loop {
        println!("Generating a {DEFAULT_QUESTION_COUNT}-question test, this can take a minute...");
        if controller.generate_test(document).await? != CallOutcome::Succeeded {
            if let Some(message) = controller.session().error() {
                println!("! {message}");
            }
            if terminal.ask("Try again? [y/N]").await? {
                continue;
            }
            controller.close();
            return Ok(());
        }

        match answer_questions(controller, terminal).await? {
            Finish::Quit => {
                controller.close();
                return Ok(());
            }
            Finish::Retake => {
                controller.retake()?;
            }
        }
    }
}

async fn answer_questions<R: AsyncBufRead + Unpin>(
    controller: &mut TestSessionController,
    terminal: &mut Terminal<R>,
) -> Result<Finish, AppError> {
    let mut elapsed = controller.subscribe_elapsed();
    render(controller);

    loop {
        let line = tokio::select! {
            line = terminal.read_line() => line?,
            Some(mark) = minute_mark(&mut elapsed) => {
                println!("[{} elapsed]", learnify_core::time::format_elapsed(mark));
                continue;
            }
        };
        let Some(line) = line else {
            return Ok(Finish::Quit);
        };

        let result = match parse_input(&line) {
            Input::Answer(label) => controller.select_current(label),
            Input::Next => controller.next(),
            Input::Previous => controller.previous(),
            Input::GoTo(index) => controller.go_to(index),
            Input::Submit => {
                if submit(controller, terminal).await? {
                    return show_results(controller, terminal).await;
                }
                Ok(())
            }
            Input::Quit => {
                if terminal.ask("Leave this test? Your answers will be lost. [y/N]").await? {
                    return Ok(Finish::Quit);
                }
                Ok(())
            }
            Input::Help => {
                println!("{QUESTION_HELP}");
                continue;
            }
            Input::Unknown(raw) => {
                println!("Unknown command {raw:?}. {QUESTION_HELP}");
                continue;
            }
        };
        if let Err(err) = result {
            debug!(error = %err, "input rejected");
            println!("{}", rejection_hint(err));
        }
        render(controller);
        // The banner has been shown once; keep it out of the next render.
        if controller.session().error().is_some() {
            controller.dismiss_error()?;
        }
    }
}

/// Walk the confirmation steps. Returns `true` once the attempt is graded.
async fn submit<R: AsyncBufRead + Unpin>(
    controller: &mut TestSessionController,
    terminal: &mut Terminal<R>,
) -> Result<bool, AppError> {
    let mut confirmation = controller.request_submit()?;
    loop {
        if !terminal.ask(&confirmation_prompt(confirmation)).await? {
            controller.decline_submit()?;
            return Ok(false);
        }
        match confirmation {
            Confirmation::Incomplete { .. } => {
                controller.confirm_incomplete()?;
                confirmation = Confirmation::Final;
            }
            Confirmation::Final => {
                println!("Submitting...");
                let outcome = controller.confirm_submit().await?;
                return Ok(outcome == CallOutcome::Succeeded);
            }
        }
    }
}

async fn show_results<R: AsyncBufRead + Unpin>(
    controller: &mut TestSessionController,
    terminal: &mut Terminal<R>,
) -> Result<Finish, AppError> {
    if let Some(completed) = controller.session().results() {
        println!("{}", render_results(completed));
    }
    loop {
        let Some(line) = terminal.read_line().await? else {
            return Ok(Finish::Quit);
        };
        match line.trim() {
            "r" | "retake" => return Ok(Finish::Retake),
            "q" | "quit" => return Ok(Finish::Quit),
            _ => println!("r retake · q quit"),
        }
    }
}

fn render(controller: &TestSessionController) {
    if let Some(state) = controller.session().in_progress() {
        println!("\n{}", render_question(state, &controller.elapsed_display()));
    }
}

/// Resolves on each whole elapsed minute; pending forever without a ticker.
async fn minute_mark(ticks: &mut Option<watch::Receiver<Duration>>) -> Option<Duration> {
    let receiver = ticks.as_mut()?;
    loop {
        receiver.changed().await.ok()?;
        let elapsed = *receiver.borrow_and_update();
        if elapsed.num_seconds() > 0 && elapsed.num_seconds() % 60 == 0 {
            return Some(elapsed);
        }
    }
}

fn rejection_hint(err: SessionError) -> &'static str {
    use learnify_core::session::Rejection;
    match err {
        SessionError::Rejected(Rejection::OutOfRange) => "No question there.",
        SessionError::Rejected(Rejection::Busy) => "Please wait for the current request.",
        SessionError::NoQuestion => "No question is displayed.",
        _ => "That is not available right now.",
    }
}
