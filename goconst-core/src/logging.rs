//! Structured logging using **tracing**.
//!
//! Events always go to stderr so the listing on stdout stays clean.
//! `RUST_LOG` controls filtering (e.g. `RUST_LOG=goconst_core=debug`); the
//! default level is `warn`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes the global tracing subscriber.
///
/// Call once at startup. With `json` set, events are emitted as JSON lines.
/// A second call is a no-op.
pub fn init_logging(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = if json {
        builder
            .json()
            .with_ansi(false)
            .with_level(true)
            .with_current_span(true)
            .try_init()
    } else {
        builder.with_ansi(false).try_init()
    };
    // already initialized by an embedding application
    let _ = result;
}
