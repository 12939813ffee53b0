//! Drives the middleware around a deliberately flaky in-process transport.
//!
//! Run with: cargo run --example flaky_service

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response};
use tower::{service_fn, Layer, Service, ServiceExt};
use tower_bastion::{is_circuit_open, BastionLayer, BoxError, BreakerConfig, TracingSink};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter("tower_bastion=warn")
        .init();

    // Fails twice with 503, then recovers.
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let flaky = service_fn(move |_req: Request<Vec<u8>>| {
        let attempts = counter.clone();
        async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            let status = if n < 2 { 503 } else { 200 };
            let resp = Response::builder()
                .status(status)
                .body(format!("attempt {}", n + 1).into_bytes())
                .unwrap();
            Ok::<_, BoxError>(resp)
        }
    });

    let mut client = BastionLayer::new()
        .retries(3)
        .base_delay(Duration::from_millis(100))
        .jitter(true)
        .logger(TracingSink)
        .layer(flaky);

    let request = Request::get("http://flaky.test/orders").body(Vec::new())?;
    let response = client.ready().await?.call(request).await?;
    println!(
        "recovered: {} {:?}",
        response.status(),
        String::from_utf8_lossy(response.body())
    );

    // A persistently failing endpoint trips the breaker.
    let broken = service_fn(|_req: Request<Vec<u8>>| async {
        Ok::<_, BoxError>(Response::builder().status(500).body(Vec::<u8>::new()).unwrap())
    });

    let mut client = BastionLayer::new()
        .retries(2)
        .base_delay(Duration::from_millis(50))
        .circuit_breaker(BreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(10),
        })
        .logger(|message: &str| println!("[sink] {message}"))
        .layer(broken);

    let request = Request::get("http://down.test/orders").body(Vec::new())?;
    let response = client.ready().await?.call(request).await?;
    println!("exhausted retries with: {}", response.status());

    let request = Request::get("http://down.test/orders").body(Vec::new())?;
    match client.ready().await?.call(request).await {
        Err(err) if is_circuit_open(&err) => println!("refused fast: {err}"),
        other => println!("unexpected outcome: {other:?}"),
    }

    Ok(())
}
