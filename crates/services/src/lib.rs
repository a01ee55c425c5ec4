#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod sessions;

pub use learnify_core::Clock;

pub use api::{AuthSession, HttpApi, TestApi, TokenPair};
pub use config::ApiConfig;
pub use error::{ApiError, ConfigError, SessionError};
pub use sessions::{CallOutcome, TestSessionController};
