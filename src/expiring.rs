use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::single_flight::SingleFlight;

/// Time since the last clear, and how long a cached value may live.
pub(crate) struct TtlClock {
    max_age: Option<Duration>,
    last_cleared: Mutex<Instant>,
}

impl TtlClock {
    pub(crate) fn new(max_age: Option<Duration>) -> Self {
        Self {
            max_age,
            last_cleared: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// If the max age has elapsed, run `clear` and restart the clock. Only one caller per elapsed
    /// window sees `true`.
    pub(crate) fn expire_with(&self, clear: impl FnOnce()) -> bool {
        let Some(max_age) = self.max_age else {
            return false;
        };
        let mut last_cleared = self.last_cleared.lock();
        if last_cleared.elapsed() < max_age {
            return false;
        }
        clear();
        *last_cleared = Instant::now();
        true
    }

    /// Run `clear` unconditionally and restart the clock.
    pub(crate) fn reset_with<R>(&self, clear: impl FnOnce() -> R) -> R {
        let mut last_cleared = self.last_cleared.lock();
        let result = clear();
        *last_cleared = Instant::now();
        result
    }
}

/// A [`SingleFlight`] cache whose value is discarded once it is older than a maximum age.
///
/// The age is measured from the last time the cache was cleared (or from construction). With no
/// maximum age, values never expire.
///
/// Calls to [`Expiring::fetch`] are serialized, so an expiry can never clear a fetch which is
/// still running and start a second one beside it.
pub struct Expiring<F: Fetcher> {
    cache: SingleFlight<F>,
    clock: TtlClock,
    exclusive: tokio::sync::Mutex<()>,
}

impl<F> Expiring<F>
where
    F: Fetcher + 'static,
{
    pub fn new(cache: SingleFlight<F>, max_age: Option<Duration>) -> Self {
        Self {
            cache,
            clock: TtlClock::new(max_age),
            exclusive: tokio::sync::Mutex::new(()),
        }
    }

    /// Fetch the cached value, clearing it first if it has reached its max age.
    ///
    /// Callers queue behind one another for the whole check and delegate.
    pub async fn fetch(&self) -> Result<F::Value, FetchError> {
        let _guard = self.exclusive.lock().await;
        if self.clock.expire_with(|| {
            self.cache.force_clear();
        }) {
            tracing::trace!(max_age = ?self.clock.max_age(), "cached value expired");
        }
        self.cache.fetch().await
    }

    /// Clear the cache and restart the expiry clock.
    ///
    /// This does not wait for a running fetch.
    pub fn force_clear(&self) -> bool {
        self.clock.reset_with(|| self.cache.force_clear())
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.clock.max_age()
    }

    pub fn cache(&self) -> &SingleFlight<F> {
        &self.cache
    }
}

#[async_trait]
impl<F> Fetcher for Expiring<F>
where
    F: Fetcher + 'static,
{
    type Value = F::Value;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        Expiring::fetch(self).await
    }

    fn force_clear(&self) -> bool {
        Expiring::force_clear(self)
    }
}
