//! Scoped operation timers and discrete event counters.
//!
//! Every logged operation acquires an [`OpGuard`] at its start. On drop the
//! guard records elapsed wall time tagged by a numeric status and emits a
//! structured log line, guaranteeing the record is written on every exit path
//! -- including an early return via `?` -- the same way a stage that bails
//! out of the worker pipeline still leaves a timing/log trace.

use std::time::Instant;

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub op_duration: Histogram,
    pub op_status: IntCounterVec,
    pub queue_depth_events: IntCounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let op_duration = Histogram::with_opts(HistogramOpts::new(
            "emojimise_operation_duration_seconds",
            "Duration of a scoped operation.",
        ))
        .expect("valid histogram opts");
        registry
            .register(Box::new(op_duration.clone()))
            .expect("register op_duration");

        let op_status = IntCounterVec::new(
            Opts::new(
                "emojimise_operation_status_total",
                "Count of operations by name and numeric status.",
            ),
            &["operation", "status"],
        )
        .expect("valid counter opts");
        registry
            .register(Box::new(op_status.clone()))
            .expect("register op_status");

        let queue_depth_events = IntCounterVec::new(
            Opts::new(
                "emojimise_discrete_events_total",
                "Count of discrete events (cache hit, stage failure, etc).",
            ),
            &["event"],
        )
        .expect("valid counter opts");
        registry
            .register(Box::new(queue_depth_events.clone()))
            .expect("register queue_depth_events");

        Self {
            registry,
            op_duration,
            op_status,
            queue_depth_events,
        }
    }
}

pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// RAII scoped completion handle for a named operation.
///
/// Acquire with [`OpGuard::start`] at the top of an operation. Call
/// [`OpGuard::finish`] on every success/error path if you want a specific
/// status recorded; otherwise `Drop` records status `500` so a panicking or
/// early-returning stage is never silently unaccounted for.
pub struct OpGuard {
    operation: &'static str,
    started: Instant,
    id: Option<String>,
    recorded: bool,
}

impl OpGuard {
    pub fn start(operation: &'static str, id: Option<String>) -> Self {
        Self {
            operation,
            started: Instant::now(),
            id,
            recorded: false,
        }
    }

    /// Records the outcome with an explicit status (HTTP-like: 200, 404, 500).
    pub fn finish(mut self, status: u16) {
        self.record(status);
        self.recorded = true;
    }

    fn record(&self, status: u16) {
        let elapsed = self.started.elapsed();
        METRICS.op_duration.observe(elapsed.as_secs_f64());
        METRICS
            .op_status
            .with_label_values(&[self.operation, &status.to_string()])
            .inc();

        if status < 400 {
            tracing::info!(
                operation = self.operation,
                id = self.id.as_deref().unwrap_or(""),
                status,
                elapsed_ms = elapsed.as_millis() as u64,
                "operation completed"
            );
        } else {
            tracing::error!(
                operation = self.operation,
                id = self.id.as_deref().unwrap_or(""),
                status,
                elapsed_ms = elapsed.as_millis() as u64,
                "operation failed"
            );
        }
    }
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        if !self.recorded {
            self.record(500);
        }
    }
}

/// Increments a named discrete event counter (e.g. `cache_hit`, `stage_failure`).
pub fn count_event(event: &str) {
    METRICS.queue_depth_events.with_label_values(&[event]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_records_on_explicit_finish() {
        let guard = OpGuard::start("test_op", Some("id-1".into()));
        guard.finish(200);
    }

    #[test]
    fn guard_records_on_drop_without_finish() {
        let _guard = OpGuard::start("test_op_drop", None);
    }
}
