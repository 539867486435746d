use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::rank::SourceRank;
use crate::response::TaggedResponse;

/// Boxed Future yielding a fetched value.
pub type FetchFuture<V> = Pin<Box<dyn Future<Output = Result<V, FetchError>> + Send>>;

/// A shareable fetcher of values of type `V`.
pub type SharedFetcher<V> = Arc<dyn Fetcher<Value = V>>;

/// Produce a value, or fail.
///
/// Sources which have not yet got a value should fail with [`FetchError::NotReady`] so that
/// polling composers can tell them apart from genuine failures.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Value: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> Result<Self::Value, FetchError>;

    /// Discard any cached state. Returns true if something was cleared.
    fn force_clear(&self) -> bool {
        false
    }

    /// Erase the type, so that different fetchers can be composed.
    fn shared(self) -> SharedFetcher<Self::Value>
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }
}

/// Every composer needs at least one fetcher, and no more than can be ranked.
pub(crate) fn check_fetcher_count(count: usize) -> Result<(), FetchError> {
    match count {
        0 => Err(FetchError::NoFetchers),
        count if count > SourceRank::MAX => Err(FetchError::TooManyFetchers {
            count,
            max: SourceRank::MAX,
        }),
        _ => Ok(()),
    }
}

/// Fetch a value tagged with the rank of the source that produced it.
#[async_trait]
pub trait MultiFetcher: Send + Sync {
    type Value: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> Result<TaggedResponse<Self::Value>, FetchError>;

    /// Clear every member. Returns true if every member was cleared.
    fn force_clear(&self) -> bool;

    /// Drop the rank and fetch only values.
    fn values(self) -> Values<Self>
    where
        Self: Sized,
    {
        Values { inner: self }
    }
}

#[async_trait]
impl<T> Fetcher for Arc<T>
where
    T: Fetcher + ?Sized,
{
    type Value = T::Value;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        (**self).fetch().await
    }

    fn force_clear(&self) -> bool {
        (**self).force_clear()
    }
}

#[async_trait]
impl<T> Fetcher for Box<T>
where
    T: Fetcher + ?Sized,
{
    type Value = T::Value;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        (**self).fetch().await
    }

    fn force_clear(&self) -> bool {
        (**self).force_clear()
    }
}

/// A [`Fetcher`] backed by a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

/// Use a closure returning a future as a [`Fetcher`].
///
/// ```
/// use cascade::{from_fn, FetchError, Fetcher};
///
/// # tokio_test::block_on(async {
/// let fetcher = from_fn(|| async { Ok::<_, FetchError>("test".to_string()) });
/// assert_eq!(fetcher.fetch().await.unwrap(), "test");
/// # });
/// ```
pub fn from_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher { f }
}

#[async_trait]
impl<F, Fut, V> Fetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, FetchError>> + Send,
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(&self) -> Result<V, FetchError> {
        (self.f)().await
    }
}

/// Adapts a [`MultiFetcher`] into a [`Fetcher`] by discarding the source rank.
#[derive(Clone)]
pub struct Values<M> {
    inner: M,
}

impl<M> Values<M> {
    /// The wrapped composer, still able to report ranks.
    pub fn get_ref(&self) -> &M {
        &self.inner
    }

    /// Unwrap the composer.
    pub fn into_inner(self) -> M {
        self.inner
    }
}

#[async_trait]
impl<M> Fetcher for Values<M>
where
    M: MultiFetcher,
{
    type Value = M::Value;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        self.inner.fetch().await.map(TaggedResponse::into_value)
    }

    fn force_clear(&self) -> bool {
        self.inner.force_clear()
    }
}
