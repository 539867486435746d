use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::expiring::TtlClock;
use crate::fetcher::check_fetcher_count;
use crate::fetcher::Fetcher;
use crate::fetcher::MultiFetcher;
use crate::fetcher::SharedFetcher;
use crate::non_blocking::NonBlocking;
use crate::response::TaggedResponse;

/// Deadline-bounded polling across non-blocking fetchers.
///
/// Fetchers are swept in order until one of them produces a value, which is returned tagged with
/// the rank of its fetcher. [`FetchError::NotReady`] failures go to the timeout callback and
/// every other failure goes to the error callback; either way the sweep carries on. Once the
/// configured max wait has elapsed the last fetcher is called one final time and its result,
/// success or failure, is returned.
///
/// The deadline bounds the polling loop, not any single fetch. One caller polls at a time.
///
/// If a max age is configured, every fetcher is cleared when it has elapsed since the last clear.
pub struct Polling<V> {
    config: FetcherConfig,
    fetchers: Vec<SharedFetcher<V>>,
    clock: TtlClock,
    exclusive: Mutex<()>,
}

impl<V> Polling<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Fails with [`FetchError::NoFetchers`] if `fetchers` is empty.
    pub fn new(
        config: FetcherConfig,
        fetchers: Vec<SharedFetcher<V>>,
    ) -> Result<Self, FetchError> {
        check_fetcher_count(fetchers.len())?;
        let clock = TtlClock::new(config.max_age());
        Ok(Self {
            config,
            fetchers,
            clock,
            exclusive: Mutex::new(()),
        })
    }

    /// Wrap every fetcher in a [`NonBlocking`] cache.
    pub fn non_blocking(
        config: FetcherConfig,
        fetchers: Vec<SharedFetcher<V>>,
    ) -> Result<Self, FetchError> {
        let fetchers = fetchers
            .into_iter()
            .map(|fetcher| NonBlocking::new(fetcher).shared())
            .collect();
        Self::new(config, fetchers)
    }

    pub async fn fetch(&self) -> Result<TaggedResponse<V>, FetchError> {
        let last = self.fetchers.last().ok_or(FetchError::NoFetchers)?;
        let _guard = self.exclusive.lock().await;

        if self.clock.expire_with(|| {
            self.clear_all();
        }) {
            tracing::trace!(fetcher = %self.config.name(), "cached values expired");
        }

        let start = Instant::now();
        while self
            .config
            .max_wait()
            .map_or(true, |max_wait| start.elapsed() < max_wait)
        {
            for (index, fetcher) in self.fetchers.iter().enumerate() {
                match fetcher.fetch().await {
                    Ok(value) => return TaggedResponse::from_position(index + 1, value),
                    Err(err) if err.is_not_ready() => self.config.report_timeout(&err),
                    Err(err) => {
                        tracing::debug!(
                            fetcher = %self.config.name(),
                            position = index + 1,
                            error = %err,
                            "fetch failed, polling on"
                        );
                        self.config.report_error(&err);
                    }
                }
            }
            self.pause().await;
        }

        tracing::debug!(
            fetcher = %self.config.name(),
            elapsed = ?start.elapsed(),
            "deadline elapsed, making a final attempt"
        );
        let value = last.fetch().await?;
        TaggedResponse::from_position(self.fetchers.len(), value)
    }

    // Background fetches need the runtime to make progress between sweeps.
    async fn pause(&self) {
        let interval = self.config.poll_interval();
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }

    fn clear_all(&self) -> bool {
        self.fetchers
            .iter()
            .fold(true, |all, fetcher| fetcher.force_clear() && all)
    }

    /// Clear every fetcher and restart the expiry clock. Returns true if every fetcher had
    /// something to clear.
    pub fn force_clear(&self) -> bool {
        self.clock.reset_with(|| self.clear_all())
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

#[async_trait]
impl<V> MultiFetcher for Polling<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(&self) -> Result<TaggedResponse<V>, FetchError> {
        Polling::fetch(self).await
    }

    fn force_clear(&self) -> bool {
        Polling::force_clear(self)
    }
}
