//! Pluggable sink for retry and breaker events.
//!
//! Logging is advisory: it never influences the retry flow, and a sink that
//! panics is silenced rather than propagated.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

/// Receives one preformatted message per retry or breaker event.
///
/// Implemented for plain closures, so a custom sink is just
/// `layer.logger(|message: &str| eprintln!("{message}"))`.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Discards every message. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _message: &str) {}
}

/// Forwards messages to the `tracing` subscriber at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        warn!(target: "tower_bastion", "{message}");
    }
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// A panicking sink must not take the retry flow down with it.
pub(crate) fn emit(sink: &dyn LogSink, message: String) {
    let _ = catch_unwind(AssertUnwindSafe(|| sink.log(&message)));
}
