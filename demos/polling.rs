use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use cascade::FetchError;
use cascade::Fetcher;
use cascade::FetcherConfig;
use cascade::Polling;

use rand::Rng;

/// A live feed which is slow to answer and sometimes fails.
struct Feed;

#[async_trait::async_trait]
impl Fetcher for Feed {
    type Value = String;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        let num = rand::rng().random_range(100..700);
        tokio::time::sleep(Duration::from_millis(num)).await;
        if num % 2 == 0 {
            return Err(FetchError::msg(format!("feed dropped ({num}ms)")));
        }
        Ok(format!("live price ({num}ms)"))
    }
}

/// A replica which always answers after a fixed delay.
struct Replica;

#[async_trait::async_trait]
impl Fetcher for Replica {
    type Value = String;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok("replica price".to_string())
    }
}

/// Both sources fetch in the background. Each call sweeps them every 25ms for up to 400ms and
/// then asks the replica one last time. Values live for 1.5s, after which both sources are
/// cleared and refetched, so the answer can move between the feed and the replica.
#[tokio::main]
async fn main() {
    let not_ready = Arc::new(AtomicUsize::new(0));
    let counter = not_ready.clone();
    let config = FetcherConfig::builder()
        .name("prices")
        .max_wait_ms(400)
        .poll_interval(Duration::from_millis(25))
        .max_age_ms(1_500)
        .on_timeout(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .on_error(|err| println!("  source failed: {err}"))
        .build();

    let polling = match Polling::non_blocking(config, vec![Feed.shared(), Replica.shared()]) {
        Ok(polling) => polling,
        Err(err) => {
            eprintln!("bad configuration: {err}");
            return;
        }
    };

    for i in 0..12 {
        let start = Instant::now();
        match polling.fetch().await {
            Ok(response) => println!(
                "{i}: {} from {} in {:?} ({} not ready)",
                response.value(),
                response.source(),
                start.elapsed(),
                not_ready.swap(0, Ordering::Relaxed)
            ),
            Err(err) => println!(
                "{i}: gave up after {:?}: {err} ({} not ready)",
                start.elapsed(),
                not_ready.swap(0, Ordering::Relaxed)
            ),
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}
