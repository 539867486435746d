use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::SendError;

use crate::error::FetchError;
use crate::fetcher::Fetcher;

type Outcome<V> = Result<V, FetchError>;

/// An in-flight computation. Only the spawned task owns the strong sender, so if that task dies
/// every subscribed receiver is closed.
type Handle<V> = Weak<broadcast::Sender<Outcome<V>>>;

enum Slot<V> {
    Empty,
    Pending(Handle<V>),
    Cached(V),
}

struct State<V> {
    slot: Slot<V>,
    /// Failure of a computation which finished with nobody waiting for it.
    unclaimed: Option<FetchError>,
}

enum Join<V> {
    Cached(V),
    Waiting(broadcast::Receiver<Outcome<V>>),
    Idle,
}

impl<V: Clone> State<V> {
    fn join(&mut self) -> Join<V> {
        let handle = match &self.slot {
            Slot::Empty => return Join::Idle,
            Slot::Cached(value) => return Join::Cached(value.clone()),
            Slot::Pending(handle) => handle.upgrade(),
        };
        match handle {
            // We subscribe whilst holding the state lock and results are only published whilst
            // holding it, so this receiver cannot miss the result. The strong sender is dropped
            // as soon as we return.
            Some(sender) => Join::Waiting(sender.subscribe()),
            None => {
                // The computation panicked or was dropped before publishing anything.
                tracing::warn!("pending fetch was abandoned, starting again");
                self.slot = Slot::Empty;
                Join::Idle
            }
        }
    }
}

struct Inner<F: Fetcher> {
    fetcher: F,
    state: Mutex<State<F::Value>>,
    request_deduplicated_counter: AtomicU64,
    request_total_counter: AtomicU64,
}

impl<F: Fetcher> Inner<F> {
    fn publish(
        &self,
        sender: &Arc<broadcast::Sender<Outcome<F::Value>>>,
        outcome: Outcome<F::Value>,
    ) {
        let mut state = self.state.lock();
        // A forced clear may have replaced our handle. If so, the slot is no longer ours but our
        // waiters still get their result.
        let current = matches!(
            &state.slot,
            Slot::Pending(handle) if handle.as_ptr() == Arc::as_ptr(sender)
        );
        if current {
            state.slot = match &outcome {
                Ok(value) => Slot::Cached(value.clone()),
                Err(_) => Slot::Empty,
            };
        }
        if let Err(SendError(Err(err))) = sender.send(outcome) {
            if current {
                state.unclaimed = Some(err);
            }
        }
    }
}

/// Single-flight memoizing cache around one fetcher.
///
/// Many concurrent callers can fetch at once, but the underlying fetch will only be invoked once.
/// A successful value is cached until [`SingleFlight::force_clear`] is called. Failures are never
/// cached: every caller waiting on a failed fetch receives the failure and the next caller tries
/// again.
///
/// The underlying fetch runs in its own tokio task, so a cancelled caller can't strand the
/// others. If the fetch panics, all waiters get [`FetchError::Abandoned`].
pub struct SingleFlight<F: Fetcher> {
    inner: Arc<Inner<F>>,
}

impl<F: Fetcher> Clone for SingleFlight<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> SingleFlight<F>
where
    F: Fetcher + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                state: Mutex::new(State {
                    slot: Slot::Empty,
                    unclaimed: None,
                }),
                request_deduplicated_counter: AtomicU64::new(0),
                request_total_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Use the cached value, wait for the pending fetch, or start a new one.
    pub async fn fetch(&self) -> Result<F::Value, FetchError> {
        self.inner.request_total_counter.fetch_add(1, Ordering::SeqCst);
        let mut receiver = {
            let mut state = self.inner.state.lock();
            match state.join() {
                Join::Cached(value) => {
                    self.inner
                        .request_deduplicated_counter
                        .fetch_add(1, Ordering::SeqCst);
                    tracing::trace!("cache hit");
                    return Ok(value);
                }
                Join::Waiting(receiver) => {
                    self.inner
                        .request_deduplicated_counter
                        .fetch_add(1, Ordering::SeqCst);
                    tracing::trace!("joined pending fetch");
                    receiver
                }
                Join::Idle => {
                    // We are about to fetch afresh, so an old failure is of no interest.
                    state.unclaimed = None;
                    self.start(&mut state)
                }
            }
        };
        receiver
            .recv()
            .await
            .unwrap_or(Err(FetchError::Abandoned))
    }

    /// Fetch without waiting.
    ///
    /// Returns the cached value if there is one. Otherwise the fetch is started (or left running)
    /// in the background and [`FetchError::NotReady`] is returned. If a background fetch failed,
    /// its error is returned once and the next call starts again.
    ///
    /// Must be called from within a tokio runtime.
    pub fn try_fetch(&self) -> Result<F::Value, FetchError> {
        self.inner.request_total_counter.fetch_add(1, Ordering::SeqCst);
        let mut state = self.inner.state.lock();
        match state.join() {
            Join::Cached(value) => {
                self.inner
                    .request_deduplicated_counter
                    .fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            Join::Waiting(_) => {
                self.inner
                    .request_deduplicated_counter
                    .fetch_add(1, Ordering::SeqCst);
                Err(FetchError::NotReady)
            }
            Join::Idle => match state.unclaimed.take() {
                Some(err) => Err(err),
                None => {
                    let _ = self.start(&mut state);
                    Err(FetchError::NotReady)
                }
            },
        }
    }

    // Must be called with the state lock held and an empty slot.
    fn start(&self, state: &mut State<F::Value>) -> broadcast::Receiver<Outcome<F::Value>> {
        let (sender, receiver) = broadcast::channel(1);
        let sender = Arc::new(sender);
        state.slot = Slot::Pending(Arc::downgrade(&sender));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.fetcher.fetch().await;
            inner.publish(&sender, outcome);
        });
        receiver
    }

    /// Empty the slot, whatever it holds. Returns true if it held a value or a pending fetch.
    ///
    /// Callers already waiting on a pending fetch still receive its result, but the result is
    /// not cached.
    pub fn force_clear(&self) -> bool {
        let mut state = self.inner.state.lock();
        state.unclaimed = None;
        let previous = std::mem::replace(&mut state.slot, Slot::Empty);
        let cleared = !matches!(previous, Slot::Empty);
        if cleared {
            tracing::trace!("cache cleared");
        }
        cleared
    }

    /// Is there a cached value?
    pub fn is_cached(&self) -> bool {
        matches!(self.inner.state.lock().slot, Slot::Cached(_))
    }

    /// Return the deduplicated request count: requests which didn't start an underlying fetch.
    pub fn request_deduplicated_count(&self) -> u64 {
        self.inner
            .request_deduplicated_counter
            .load(Ordering::SeqCst)
    }

    /// Return the total request count.
    pub fn request_count(&self) -> u64 {
        self.inner.request_total_counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> Fetcher for SingleFlight<F>
where
    F: Fetcher + 'static,
{
    type Value = F::Value;

    async fn fetch(&self) -> Result<Self::Value, FetchError> {
        SingleFlight::fetch(self).await
    }

    fn force_clear(&self) -> bool {
        SingleFlight::force_clear(self)
    }
}
