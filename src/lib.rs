//! # tower-bastion
//!
//! Retry with exponential backoff and a circuit breaker for outbound HTTP
//! calls, packaged as Tower middleware.
//!
//! The crate wraps any `tower::Service<http::Request<B>>` (hyper's client,
//! a `service_fn` shim over another transport, a test stub) and adds two
//! behaviours around it:
//!
//! - **Retry**: failed responses (transport errors, or statuses from a
//!   configurable retryable set) are re-issued after an exponentially
//!   growing, optionally jittered delay, up to a configured maximum number
//!   of retries.
//! - **Circuit breaker**: consecutive failures across *all* requests through
//!   one attachment are counted; once a threshold is reached, calls fail
//!   fast with [`CircuitOpenError`] until a reset timeout has elapsed, after
//!   which probes are let through again. Any success closes the circuit.
//!
//! The transport itself is untouched: attachment is a [`tower::Layer`], so
//! the wrapped client keeps working with every other middleware in the
//! stack.
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tower::{service_fn, Layer, Service, ServiceExt};
//! use tower_bastion::{BastionLayer, BoxError, BreakerConfig, TracingSink};
//!
//! # async fn example() -> Result<(), BoxError> {
//! let client = service_fn(|_req: http::Request<Vec<u8>>| async {
//!     // dispatch on the real transport here
//!     Ok::<_, BoxError>(http::Response::new(Vec::<u8>::new()))
//! });
//!
//! let mut client = BastionLayer::new()
//!     .retries(3)
//!     .base_delay(Duration::from_millis(200))
//!     .max_delay(Duration::from_secs(5))
//!     .circuit_breaker(BreakerConfig::default())
//!     .logger(TracingSink)
//!     .layer(client);
//!
//! let request = http::Request::get("https://api.test/widgets").body(Vec::new())?;
//! let response = client.ready().await?.call(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod breaker;
pub mod config;
pub mod error;
pub mod log;

mod layer;

pub use breaker::CircuitBreaker;
pub use config::{BreakerConfig, RetryConfig};
pub use error::{is_circuit_open, BoxError, CircuitOpenError};
pub use layer::{Bastion, BastionLayer};
pub use log::{LogSink, NoopSink, TracingSink};

// Re-export the Tower traits callers need to drive the wrapped client.
pub use tower::{Layer, Service, ServiceExt};
