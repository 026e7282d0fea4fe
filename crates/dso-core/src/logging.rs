//! Tracing subscriber setup for the `dso` binary
//!
//! Logs go to stderr so stdout stays reserved for responses.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directive (e.g. `dso_core=debug`)
pub const LOG_ENV: &str = "DSO_LOG";

/// Install the global subscriber
///
/// The filter comes from [`LOG_ENV`], falling back to `info`. With `json`
/// set every event is one JSON object per line.
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_tracing(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    }
}
