use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::single_flight::SingleFlight;

/// A caching source that never waits for its fetcher.
///
/// Fetching returns the cached value if there is one, otherwise it makes sure the underlying fetch
/// is running and fails with [`FetchError::NotReady`]. See [`SingleFlight::try_fetch`].
pub struct NonBlocking<F: Fetcher> {
    cache: SingleFlight<F>,
}

impl<F: Fetcher> Clone for NonBlocking<F> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<F> NonBlocking<F>
where
    F: Fetcher + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self::from_cache(SingleFlight::new(fetcher))
    }

    /// Fetch from an existing cache without waiting on it. The cache stays shared with any
    /// blocking users.
    pub fn from_cache(cache: SingleFlight<F>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &SingleFlight<F> {
        &self.cache
    }
}

#[async_trait]
impl<F> Fetcher for NonBlocking<F>
where
    F: Fetcher + 'static,
{
    type Value = F::Value;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        self.cache.try_fetch()
    }

    fn force_clear(&self) -> bool {
        self.cache.force_clear()
    }
}
