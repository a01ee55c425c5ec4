#![forbid(unsafe_code)]

mod interactive;
mod screen;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use learnify_core::model::{AttemptId, DocumentId};
use services::{
    ApiConfig, ApiError, AuthSession, Clock, ConfigError, HttpApi, SessionError, TestApi,
    TestSessionController, TokenPair,
};

use crate::interactive::Terminal;

#[derive(Debug, Error)]
enum ArgsError {
    #[error("{flag} requires a value")]
    MissingValue { flag: &'static str },
    #[error("{command} requires {flag}")]
    MissingFlag {
        command: &'static str,
        flag: &'static str,
    },
    #[error("unknown argument: {0}")]
    UnknownArg(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid {flag} value: {raw}")]
    InvalidId {
        flag: &'static str,
        raw: String,
        #[source]
        source: learnify_core::Error,
    },
    #[error("invalid {flag} value: {raw}")]
    InvalidNumber { flag: &'static str, raw: String },
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Args(#[from] ArgsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message("Request failed."))]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(
        "not logged in: set LEARNIFY_EMAIL and LEARNIFY_PASSWORD, or LEARNIFY_ACCESS_TOKEN"
    )]
    NotAuthenticated,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T>(flag: &'static str, raw: String) -> Result<T, ArgsError>
where
    T: std::str::FromStr,
    learnify_core::Error: From<T::Err>,
{
    raw.parse::<T>().map_err(|err| ArgsError::InvalidId {
        flag,
        raw,
        source: err.into(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app documents");
    eprintln!("  app take --document <uuid>");
    eprintln!("  app attempts [--document <uuid>]");
    eprintln!("  app attempt --id <uuid>");
    eprintln!("  app stats");
    eprintln!("  app logout");
    eprintln!();
    eprintln!("Options (any command):");
    eprintln!("  --api-url <url>      backend base url (default http://localhost:8000/api)");
    eprintln!("  --timeout <secs>     request timeout in seconds (default 60)");
    eprintln!("  --email <email>      login email; password comes from LEARNIFY_PASSWORD");
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  LEARNIFY_API_URL, LEARNIFY_API_TIMEOUT_SECS");
    eprintln!("  LEARNIFY_EMAIL, LEARNIFY_PASSWORD");
    eprintln!("  LEARNIFY_ACCESS_TOKEN, LEARNIFY_REFRESH_TOKEN");
    eprintln!("  LEARNIFY_LOG, LEARNIFY_LOG_FORMAT=json");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Documents,
    Take { document: DocumentId },
    Attempts { document: Option<DocumentId> },
    Attempt { id: AttemptId },
    Stats,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    email: Option<String>,
}

impl Args {
    /// Parse the arguments after the program name. `Ok(None)` means help was asked for.
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let name = match args.next() {
            None => return Ok(None),
            Some(first) if matches!(first.as_str(), "--help" | "-h" | "help") => return Ok(None),
            Some(first) => first,
        };

        let mut api_url = None;
        let mut timeout_secs = None;
        let mut email = None;
        let mut document: Option<DocumentId> = None;
        let mut id: Option<AttemptId> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api-url" => api_url = Some(require_value(&mut args, "--api-url")?),
                "--timeout" => {
                    let value = require_value(&mut args, "--timeout")?;
                    let secs = value
                        .parse::<u64>()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or(ArgsError::InvalidNumber {
                            flag: "--timeout",
                            raw: value,
                        })?;
                    timeout_secs = Some(secs);
                }
                "--email" => email = Some(require_value(&mut args, "--email")?),
                "--document" => {
                    let value = require_value(&mut args, "--document")?;
                    document = Some(parse_id("--document", value)?);
                }
                "--id" => {
                    let value = require_value(&mut args, "--id")?;
                    id = Some(parse_id("--id", value)?);
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_str() {
            "documents" => Command::Documents,
            "take" => Command::Take {
                document: document.ok_or(ArgsError::MissingFlag {
                    command: "take",
                    flag: "--document",
                })?,
            },
            "attempts" => Command::Attempts { document },
            "attempt" => Command::Attempt {
                id: id.ok_or(ArgsError::MissingFlag {
                    command: "attempt",
                    flag: "--id",
                })?,
            },
            "stats" => Command::Stats,
            "logout" => Command::Logout,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        Ok(Some(Self {
            command,
            api_url,
            timeout_secs,
            email,
        }))
    }
}

/// How the app obtains its tokens.
enum Credentials {
    Tokens(TokenPair),
    Login { email: String, password: String },
}

impl Credentials {
    fn from_env(email_override: Option<String>) -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.trim().is_empty());

        // An explicit --email means the user wants to log in, not reuse tokens.
        if email_override.is_none() {
            if let Some(access) = var("LEARNIFY_ACCESS_TOKEN") {
                let refresh = var("LEARNIFY_REFRESH_TOKEN").unwrap_or_default();
                return Some(Self::Tokens(TokenPair::new(access, refresh)));
            }
        }
        let email = email_override.or_else(|| var("LEARNIFY_EMAIL"))?;
        let password = var("LEARNIFY_PASSWORD")?;
        Some(Self::Login { email, password })
    }
}

fn load_config(args: &Args) -> Result<ApiConfig, AppError> {
    let mut config = ApiConfig::from_env()?;
    if let Some(url) = &args.api_url {
        config = ApiConfig::new(url)?.with_timeout(config.timeout());
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

async fn authenticate(api: &HttpApi, email: Option<String>) -> Result<(), AppError> {
    match Credentials::from_env(email).ok_or(AppError::NotAuthenticated)? {
        Credentials::Tokens(tokens) => api.auth().set(tokens),
        Credentials::Login { email, password } => api.login(&email, &password).await?,
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    let config = load_config(&args)?;
    info!(api = %config.base_url(), "using backend");
    let api = Arc::new(HttpApi::new(config, Arc::new(AuthSession::new()))?);
    authenticate(&api, args.email.clone()).await?;

    match args.command {
        Command::Documents => {
            println!("{}", screen::render_documents(&api.list_documents().await?));
        }
        Command::Take { document } => {
            let mut controller = TestSessionController::new(api, Clock::default_clock());
            let mut terminal = Terminal::stdin();
            interactive::take_test(&mut controller, &mut terminal, document).await?;
        }
        Command::Attempts { document } => {
            println!("{}", screen::render_attempts(&api.list_attempts(document).await?));
        }
        Command::Attempt { id } => {
            println!("{}", screen::render_attempt(&api.get_attempt(id).await?));
        }
        Command::Stats => {
            println!("{}", screen::render_stats(&api.test_stats().await?));
        }
        Command::Logout => {
            api.logout().await?;
            println!("Logged out.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, ArgsError> {
        Args::parse(args.iter().map(|arg| (*arg).to_owned()))
    }

    const DOC: &str = "6f1c5a34-8a8e-4d36-9d7c-2f1e0b6c1a11";

    #[test]
    fn take_requires_document() {
        assert!(matches!(
            parse(&["take"]),
            Err(ArgsError::MissingFlag { flag: "--document", .. })
        ));
        let args = parse(&["take", "--document", DOC]).unwrap().unwrap();
        assert_eq!(
            args.command,
            Command::Take {
                document: DOC.parse().unwrap()
            }
        );
    }

    #[test]
    fn global_flags_are_accepted_after_command() {
        let args = parse(&["stats", "--api-url", "http://api.test/api", "--timeout", "5"])
            .unwrap()
            .unwrap();
        assert_eq!(args.command, Command::Stats);
        assert_eq!(args.api_url.as_deref(), Some("http://api.test/api"));
        assert_eq!(args.timeout_secs, Some(5));
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            parse(&["attempts", "--document", "nope"]),
            Err(ArgsError::InvalidId { flag: "--document", .. })
        ));
        assert!(matches!(
            parse(&["stats", "--timeout", "0"]),
            Err(ArgsError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse(&["documents", "--timeout"]),
            Err(ArgsError::MissingValue { flag: "--timeout" })
        ));
        assert!(matches!(parse(&["grade"]), Err(ArgsError::UnknownCommand(_))));
    }

    #[test]
    fn help_and_empty_args_show_usage() {
        assert!(parse(&[]).unwrap().is_none());
        assert!(parse(&["--help"]).unwrap().is_none());
        assert!(parse(&["documents", "-h"]).unwrap().is_none());
    }
}
