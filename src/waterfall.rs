use async_trait::async_trait;

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::expiring::Expiring;
use crate::fetcher::check_fetcher_count;
use crate::fetcher::Fetcher;
use crate::fetcher::MultiFetcher;
use crate::fetcher::SharedFetcher;
use crate::response::TaggedResponse;
use crate::single_flight::SingleFlight;

/// Ordered fallback across fetchers.
///
/// Fetchers are tried in the order given, and the first value found is returned tagged with the
/// rank of its fetcher. A failure of any fetcher but the last is passed to the configured error
/// callback and the next fetcher is tried. A failure of the last fetcher is returned as is.
///
/// Nothing is remembered between calls: use [`Waterfall::caching`] to put each fetcher behind
/// its own cache.
pub struct Waterfall<V> {
    config: FetcherConfig,
    fetchers: Vec<SharedFetcher<V>>,
}

impl<V> Waterfall<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Fails with [`FetchError::NoFetchers`] if `fetchers` is empty.
    pub fn new(
        config: FetcherConfig,
        fetchers: Vec<SharedFetcher<V>>,
    ) -> Result<Self, FetchError> {
        check_fetcher_count(fetchers.len())?;
        Ok(Self { config, fetchers })
    }

    /// Wrap every fetcher in a single-flight cache which expires after the configured max age.
    pub fn caching(
        config: FetcherConfig,
        fetchers: Vec<SharedFetcher<V>>,
    ) -> Result<Self, FetchError> {
        let max_age = config.max_age();
        let fetchers = fetchers
            .into_iter()
            .map(|fetcher| Expiring::new(SingleFlight::new(fetcher), max_age).shared())
            .collect();
        Self::new(config, fetchers)
    }

    pub async fn fetch(&self) -> Result<TaggedResponse<V>, FetchError> {
        let (last, fallbacks) = self
            .fetchers
            .split_last()
            .ok_or(FetchError::NoFetchers)?;

        for (index, fetcher) in fallbacks.iter().enumerate() {
            match fetcher.fetch().await {
                Ok(value) => return TaggedResponse::from_position(index + 1, value),
                Err(err) => {
                    tracing::debug!(
                        fetcher = %self.config.name(),
                        position = index + 1,
                        error = %err,
                        "fetch failed, falling back"
                    );
                    self.config.report_error(&err);
                }
            }
        }

        let value = last.fetch().await?;
        TaggedResponse::from_position(self.fetchers.len(), value)
    }

    /// Clear every fetcher. Returns true if every one of them had something to clear.
    pub fn force_clear(&self) -> bool {
        self.fetchers
            .iter()
            .fold(true, |all, fetcher| fetcher.force_clear() && all)
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

#[async_trait]
impl<V> MultiFetcher for Waterfall<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(&self) -> Result<TaggedResponse<V>, FetchError> {
        Waterfall::fetch(self).await
    }

    fn force_clear(&self) -> bool {
        Waterfall::force_clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::from_fn;
    use crate::rank::SourceRank;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tokio_test::assert_err;
    use tokio_test::assert_ok;

    struct Recorder {
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                errors: Arc::new(Mutex::new(vec![])),
            }
        }

        fn config(&self) -> FetcherConfig {
            let errors = self.errors.clone();
            FetcherConfig::builder()
                .on_error(move |err| errors.lock().push(err.to_string()))
                .build()
        }

        fn errors(&self) -> Vec<String> {
            self.errors.lock().clone()
        }
    }

    fn succeed(calls: &Arc<AtomicUsize>, value: &'static str) -> SharedFetcher<String> {
        let calls = calls.clone();
        from_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, FetchError>(value.to_string()) }
        })
        .shared()
    }

    fn fail(calls: &Arc<AtomicUsize>, message: &'static str) -> SharedFetcher<String> {
        let calls = calls.clone();
        from_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<String, _>(FetchError::msg(message)) }
        })
        .shared()
    }

    fn counters() -> [Arc<AtomicUsize>; 3] {
        std::array::from_fn(|_| Arc::new(AtomicUsize::new(0)))
    }

    #[tokio::test]
    async fn it_returns_the_primary_value() {
        let recorder = Recorder::new();
        let [a, b, c] = counters();
        let waterfall = assert_ok!(Waterfall::new(
            recorder.config(),
            vec![succeed(&a, "test"), fail(&b, "B"), fail(&c, "C")],
        ));

        for _i in 0..5 {
            let response = assert_ok!(waterfall.fetch().await);
            assert_eq!(response.source(), SourceRank::Primary);
            assert_eq!(response.value(), "test");
        }
        assert!(recorder.errors().is_empty());
        assert_eq!(b.load(Ordering::SeqCst), 0);
        assert_eq!(c.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn it_falls_back_to_the_next_source() {
        let recorder = Recorder::new();
        let [a, b, c] = counters();
        let waterfall = assert_ok!(Waterfall::new(
            recorder.config(),
            vec![fail(&a, "A"), succeed(&b, "test"), fail(&c, "C")],
        ));

        let response = assert_ok!(waterfall.fetch().await);
        assert_eq!(response.source(), SourceRank::Secondary);
        assert_eq!(response.into_value(), "test");
        assert_eq!(recorder.errors(), vec!["A".to_string()]);
        assert_eq!(c.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn it_tags_the_last_source() {
        let recorder = Recorder::new();
        let [a, b, c] = counters();
        let waterfall = assert_ok!(Waterfall::new(
            recorder.config(),
            vec![fail(&a, "A"), fail(&b, "B"), succeed(&c, "test")],
        ));

        let response = assert_ok!(waterfall.fetch().await);
        assert_eq!(response.source(), SourceRank::Tertiary);
        assert_eq!(recorder.errors().len(), 2);
    }

    #[tokio::test]
    async fn it_propagates_the_last_failure() {
        let recorder = Recorder::new();
        let [a, b, c] = counters();
        let waterfall = assert_ok!(Waterfall::new(
            recorder.config(),
            vec![fail(&a, "A"), fail(&b, "B"), fail(&c, "C")],
        ));

        let err = assert_err!(waterfall.fetch().await);
        assert_eq!(err.to_string(), "C");
        assert_eq!(recorder.errors(), vec!["A".to_string(), "B".to_string()]);
        for calls in [a, b, c] {
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn it_propagates_the_last_failure_through_caches() {
        let recorder = Recorder::new();
        let [a, b, c] = counters();
        let waterfall = assert_ok!(Waterfall::caching(
            recorder.config(),
            vec![fail(&a, "A"), fail(&b, "B"), fail(&c, "C")],
        ));

        let err = assert_err!(waterfall.fetch().await);
        assert_eq!(err.to_string(), "C");
        assert!(matches!(err, FetchError::Source(_)));
        assert_eq!(recorder.errors(), vec!["A".to_string(), "B".to_string()]);

        // Nothing was cached, so every source is asked again.
        let err = assert_err!(waterfall.fetch().await);
        assert_eq!(err.to_string(), "C");
        for calls in [a, b, c] {
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
        assert!(!waterfall.force_clear());
    }

    #[tokio::test]
    async fn it_rejects_an_empty_list() {
        let recorder = Recorder::new();
        let result = Waterfall::<String>::new(recorder.config(), vec![]);
        assert!(matches!(result, Err(FetchError::NoFetchers)));
        assert!(recorder.errors().is_empty());
    }

    #[tokio::test]
    async fn it_rejects_more_sources_than_ranks() {
        let [a, b, c] = counters();
        let fetchers = vec![
            succeed(&a, "1"),
            succeed(&a, "2"),
            succeed(&b, "3"),
            succeed(&c, "4"),
        ];
        let result = Waterfall::new(FetcherConfig::default(), fetchers);
        assert!(matches!(
            result,
            Err(FetchError::TooManyFetchers { count: 4, max: 3 })
        ));
    }

    #[tokio::test]
    async fn it_caches_each_source() {
        let recorder = Recorder::new();
        let [a, b, c] = counters();
        let waterfall = assert_ok!(Waterfall::caching(
            recorder.config(),
            vec![fail(&a, "A"), succeed(&b, "test"), fail(&c, "C")],
        ));

        for _i in 0..5 {
            let response = assert_ok!(waterfall.fetch().await);
            assert_eq!(response.source(), SourceRank::Secondary);
        }
        // Failures are retried every time, successes are cached.
        assert_eq!(a.load(Ordering::SeqCst), 5);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.errors().len(), 5);

        // Only the second source held a value.
        assert!(!waterfall.force_clear());
        assert_ok!(waterfall.fetch().await);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn it_unwraps_values() {
        let [a, b, _] = counters();
        let waterfall = assert_ok!(Waterfall::new(
            FetcherConfig::default(),
            vec![fail(&a, "A"), succeed(&b, "test")],
        ));
        assert_eq!(waterfall.len(), 2);

        let values = waterfall.values();
        assert_eq!(assert_ok!(values.fetch().await), "test");

        // The composer is still there underneath, ranks and all.
        let response = assert_ok!(values.get_ref().fetch().await);
        assert_eq!(response.source(), SourceRank::Secondary);
        let waterfall = values.into_inner();
        assert_eq!(waterfall.len(), 2);
        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }
}
