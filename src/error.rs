//! Error types for the middleware.
//!
//! The layer originates exactly one error of its own: [`CircuitOpenError`].
//! Every other terminal outcome surfaces the transport's original error or
//! response unchanged, so callers keep the full status and details of the
//! final failure.

use http::{Method, Uri};
use thiserror::Error;

/// Boxed error type shared with the Tower ecosystem.
pub type BoxError = tower::BoxError;

/// Returned when the circuit breaker refused a call before it reached the
/// transport.
#[derive(Debug, Error)]
#[error("circuit breaker open: {method} {uri}")]
pub struct CircuitOpenError {
    /// Method of the refused request.
    pub method: Method,
    /// Target of the refused request.
    pub uri: Uri,
}

impl CircuitOpenError {
    pub(crate) fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }
}

/// Whether a boxed error is a refusal by the circuit breaker.
pub fn is_circuit_open(error: &BoxError) -> bool {
    error.downcast_ref::<CircuitOpenError>().is_some()
}
