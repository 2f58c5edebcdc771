//! Tracing initialisation for the autosnap binary.
//!
//! Progress lines and diagnostics are `tracing` events; the subscriber
//! installed here writes them to stdout, as plain text or JSON lines.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON instead of plain text.
/// * `level`: default verbosity when `RUST_LOG` is not set.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let stdout_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(stdout_layer.json()).try_init()
    } else {
        registry.with(stdout_layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
