//! Structured logging setup for the service.
//!
//! Configures the `tracing` ecosystem with file names, line numbers, span
//! close events, and a level controlled by `EMOJIMISE_LOG_LEVEL`.

use tracing_subscriber::{
    EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Initializes the global tracing subscriber, filtering by `level`
/// ("trace"/"debug"/"info"/"warn"/"error"; invalid values fall back to info).
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}
