//! Retry middleware and its attachment layer.
//!
//! [`BastionLayer`] is the attachment point: applying it to a Tower HTTP
//! client registers the success and failure handling around the client
//! without replacing anything on it, so it composes with any other
//! middleware in a `ServiceBuilder` stack. [`Bastion`] is the produced
//! service; its call future runs the retry loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::{Request, Response};
use tokio::time::sleep;
use tower::{Layer, Service, ServiceExt};

use crate::backoff;
use crate::breaker::CircuitBreaker;
use crate::config::{BreakerConfig, RetryConfig};
use crate::error::{BoxError, CircuitOpenError};
use crate::log::{self, LogSink, NoopSink};

/// Attaches retry and circuit-breaker behaviour to a Tower HTTP client.
///
/// Each `layer()` call is one attachment and gets its own circuit breaker;
/// applying the layer twice stacks two independent pipelines (avoiding
/// double attachment is the caller's responsibility).
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tower::{service_fn, Layer, Service, ServiceExt};
/// use tower_bastion::{BastionLayer, BoxError, BreakerConfig};
///
/// # async fn example() -> Result<(), BoxError> {
/// let client = service_fn(|_req: http::Request<Vec<u8>>| async {
///     // the real transport goes here
///     Ok::<_, BoxError>(http::Response::new(Vec::<u8>::new()))
/// });
///
/// let mut client = BastionLayer::new()
///     .retries(5)
///     .base_delay(Duration::from_millis(100))
///     .circuit_breaker(BreakerConfig::default())
///     .layer(client);
///
/// let request = http::Request::get("https://api.test/health").body(Vec::new())?;
/// let response = client.ready().await?.call(request).await?;
/// # Ok(())
/// # }
/// ```
pub struct BastionLayer {
    config: RetryConfig,
    breaker: Option<BreakerConfig>,
    sink: Arc<dyn LogSink>,
}

impl Default for BastionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl BastionLayer {
    /// A layer with default retry behaviour, no circuit breaker, and no
    /// logging.
    pub fn new() -> Self {
        Self::from_config(RetryConfig::default())
    }

    /// A layer with a preassembled retry configuration.
    pub fn from_config(config: RetryConfig) -> Self {
        Self {
            config,
            breaker: None,
            sink: Arc::new(NoopSink),
        }
    }

    /// Maximum number of retries per logical request.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Backoff base delay.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Backoff cap.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Enable or disable delay randomization.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Replace the set of retryable status codes.
    pub fn retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.retry_status_codes = codes.into_iter().collect();
        self
    }

    /// Enable the circuit breaker.
    pub fn circuit_breaker(mut self, config: BreakerConfig) -> Self {
        self.breaker = Some(config);
        self
    }

    /// Route retry and breaker events to a sink. Use [`crate::TracingSink`]
    /// for the default `tracing` output, or pass a closure.
    pub fn logger(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Route retry and breaker events to a closure.
    pub fn logger_fn<F>(self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger(f)
    }

    /// Discard retry and breaker events. This is the default.
    pub fn silent(mut self) -> Self {
        self.sink = Arc::new(NoopSink);
        self
    }
}

impl<S> Layer<S> for BastionLayer {
    type Service = Bastion<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Bastion {
            inner,
            config: Arc::new(self.config.clone()),
            breaker: self
                .breaker
                .as_ref()
                .map(|config| Arc::new(CircuitBreaker::new(config))),
            sink: self.sink.clone(),
        }
    }
}

/// The attached middleware. Created by [`BastionLayer::layer`]; clones share
/// the attachment's circuit breaker.
#[derive(Clone)]
pub struct Bastion<S> {
    inner: S,
    config: Arc<RetryConfig>,
    breaker: Option<Arc<CircuitBreaker>>,
    sink: Arc<dyn LogSink>,
}

/// Mutable per-logical-request state. One record per call, surviving across
/// that call's physical attempts and dropped with its future.
#[derive(Debug, Default)]
struct AttemptState {
    retries: u32,
}

/// `http::Request` is not `Clone`; rebuild it part by part so the original
/// descriptor can be re-issued.
fn clone_request<B: Clone>(req: &Request<B>) -> Request<B> {
    let mut clone = Request::new(req.body().clone());
    *clone.method_mut() = req.method().clone();
    *clone.uri_mut() = req.uri().clone();
    *clone.version_mut() = req.version();
    *clone.headers_mut() = req.headers().clone();
    *clone.extensions_mut() = req.extensions().clone();
    clone
}

impl<S, B, RB> Service<Request<B>> for Bastion<S>
where
    S: Service<Request<B>, Response = Response<RB>, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Clone + Send + 'static,
    RB: Send + 'static,
{
    type Response = Response<RB>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is driven per attempt inside the call future.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // Each call future owns a clone of the inner service, so a request
        // sleeping between attempts never stalls other requests.
        let mut inner = self.inner.clone();
        let config = self.config.clone();
        let breaker = self.breaker.clone();
        let sink = self.sink.clone();

        Box::pin(async move {
            let method = req.method().clone();
            let uri = req.uri().clone();
            let mut attempt = AttemptState::default();

            loop {
                if let Some(breaker) = &breaker {
                    if !breaker.allow() {
                        log::emit(&*sink, format!("circuit open -> {method} {uri}"));
                        return Err(CircuitOpenError::new(method.clone(), uri.clone()).into());
                    }
                }

                let outcome = inner.ready().await?.call(clone_request(&req)).await;

                let succeeded = matches!(
                    &outcome,
                    Ok(resp) if !(resp.status().is_client_error() || resp.status().is_server_error())
                );
                if succeeded {
                    if let Some(breaker) = &breaker {
                        breaker.on_success();
                    }
                    return outcome;
                }

                // A transport-level failure has no response and therefore no
                // status; it is always retryable.
                let status = match &outcome {
                    Ok(resp) => Some(resp.status().as_u16()),
                    Err(_) => None,
                };
                let retryable = match status {
                    Some(code) => config.is_retryable_status(code),
                    None => true,
                };

                if !retryable || attempt.retries >= config.retries {
                    if let Some(breaker) = &breaker {
                        breaker.on_failure();
                    }
                    log::emit(
                        &*sink,
                        format!(
                            "giving up after {} retries -> {method} {uri}",
                            attempt.retries
                        ),
                    );
                    // Surface the original outcome unchanged: the transport
                    // error as-is, or the error-status response for the
                    // caller to inspect.
                    return outcome;
                }

                attempt.retries += 1;
                if let Some(breaker) = &breaker {
                    breaker.on_failure();
                }

                let delay = backoff::delay_for_attempt(attempt.retries, &config);
                log::emit(
                    &*sink,
                    format!(
                        "retry {}/{} in {}ms -> {method} {uri}",
                        attempt.retries,
                        config.retries,
                        delay.as_millis()
                    ),
                );
                sleep(delay).await;
            }
        })
    }
}
