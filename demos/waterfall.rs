use std::time::Duration;
use std::time::Instant;

use cascade::FetchError;
use cascade::Fetcher;
use cascade::FetcherConfig;
use cascade::Waterfall;

use rand::Rng;

/// A remote source which is often unavailable.
struct Remote;

#[async_trait::async_trait]
impl Fetcher for Remote {
    type Value = String;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        let num = rand::rng().random_range(100..200);
        tokio::time::sleep(Duration::from_millis(num)).await;
        if num % 2 == 0 {
            return Err(FetchError::msg(format!("remote unavailable ({num})")));
        }
        Ok(format!("remote value ({num})"))
    }
}

/// A local copy which is always there, but may be out of date.
struct Local;

#[async_trait::async_trait]
impl Fetcher for Local {
    type Value = String;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        Ok("local value".to_string())
    }
}

/// Prefer the remote source and fall back to the local one. Each source is cached for 500ms,
/// so failed remote fetches are retried on each call while successful ones are reused.
#[tokio::main]
async fn main() -> Result<(), FetchError> {
    let config = FetcherConfig::builder()
        .name("demo")
        .max_age_ms(500)
        .on_error(|err| println!("  fell back: {err}"))
        .build();
    let waterfall = Waterfall::caching(config, vec![Remote.shared(), Local.shared()])?;

    for i in 0..10 {
        let start = Instant::now();
        let response = waterfall.fetch().await?;
        println!(
            "{i}: {} from {} in {:?}",
            response.value(),
            response.source(),
            start.elapsed()
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    Ok(())
}
