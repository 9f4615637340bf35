/*!
 * Structured Tracing
 * Subscriber setup and timed spans for lock workloads
 *
 * Features:
 * - Compact human-readable logs or JSON for structured parsing
 * - Thread ids and names on every event (handoffs cross threads)
 * - Run spans that flag slow workloads
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Runs slower than this are reported at warn level
const SLOW_RUN: Duration = Duration::from_secs(5);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - MCS_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("MCS_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one workload run, timed on drop
pub struct RunSpan {
    span: tracing::Span,
    start: Instant,
    name: String,
}

impl RunSpan {
    pub fn new(name: &str, lock: &str) -> Self {
        let span = span!(
            Level::DEBUG,
            "run",
            run = name,
            lock = lock,
            duration_ms = tracing::field::Empty,
            atomic = tracing::field::Empty,
        );

        let _entered = span.enter();
        debug!(run = name, lock = lock, "run started");
        drop(_entered);

        Self {
            span,
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    /// Record whether the run kept its critical sections atomic
    pub fn record_atomic(&self, atomic: bool) {
        self.span.record("atomic", atomic);
    }

    /// Time since the span was opened
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_ms", duration.as_millis() as u64);

        if duration > SLOW_RUN {
            warn!(
                run = %self.name,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow run detected"
            );
        } else {
            debug!(
                run = %self.name,
                duration_ms = duration.as_millis() as u64,
                "run completed"
            );
        }
    }
}

/// Helper to open a run span
#[inline]
pub fn span_run(name: &str, lock: &str) -> RunSpan {
    RunSpan::new(name, lock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn test_run_span_times() {
        let span = span_run("unit", "none");
        span.record_atomic(true);
        std::thread::sleep(Duration::from_millis(5));
        assert!(span.elapsed() >= Duration::from_millis(5));
    }
}
