//! Tracing subscriber setup.
//!
//! `LEARNIFY_LOG` holds the filter directives (default `info`) and
//! `LEARNIFY_LOG_FORMAT=json` switches to structured output. Logs go to
//! stderr so the test screens on stdout stay readable.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LEARNIFY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match std::env::var("LEARNIFY_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
