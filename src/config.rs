use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;

/// Observer for non-fatal failures. It cannot influence control flow.
pub type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

const DEFAULT_NAME: &str = "cascade";

fn noop() -> ErrorCallback {
    Arc::new(|_: &FetchError| {})
}

/// Configuration shared by the composers.
///
/// Everything has a default: no expiry, no deadline, no pause between polling sweeps, and
/// callbacks which do nothing.
#[derive(Clone)]
pub struct FetcherConfig {
    pub(crate) name: String,
    pub(crate) max_age: Option<Duration>,
    pub(crate) max_wait: Option<Duration>,
    pub(crate) poll_interval: Duration,
    pub(crate) on_error: ErrorCallback,
    pub(crate) on_timeout: ErrorCallback,
}

impl FetcherConfig {
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn report_error(&self, err: &FetchError) {
        (self.on_error)(err)
    }

    pub(crate) fn report_timeout(&self, err: &FetchError) {
        (self.on_timeout)(err)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfigBuilder::new().build()
    }
}

impl fmt::Debug for FetcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherConfig")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .field("max_wait", &self.max_wait)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FetcherConfig`].
pub struct FetcherConfigBuilder {
    name: String,
    max_age: Option<Duration>,
    max_wait: Option<Duration>,
    poll_interval: Duration,
    on_error: Option<ErrorCallback>,
    on_timeout: Option<ErrorCallback>,
}

impl Default for FetcherConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FetcherConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            max_age: None,
            max_wait: None,
            poll_interval: Duration::ZERO,
            on_error: None,
            on_timeout: None,
        }
    }

    /// Sets the name reported in tracing events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Discard cached values this long after the last clear.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn max_age_ms(self, max_age_ms: u64) -> Self {
        self.max_age(Duration::from_millis(max_age_ms))
    }

    /// Stop polling this long after a fetch started, and make one final attempt.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn max_wait_ms(self, max_wait_ms: u64) -> Self {
        self.max_wait(Duration::from_millis(max_wait_ms))
    }

    /// Sleep between polling sweeps. With the default of zero, sweeps only yield to the runtime.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Called with each failure that a composer recovers from.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FetchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Called each time a polled source is not ready.
    pub fn on_timeout<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FetchError) + Send + Sync + 'static,
    {
        self.on_timeout = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> FetcherConfig {
        FetcherConfig {
            name: self.name,
            max_age: self.max_age,
            max_wait: self.max_wait,
            poll_interval: self.poll_interval,
            on_error: self.on_error.unwrap_or_else(noop),
            on_timeout: self.on_timeout.unwrap_or_else(noop),
        }
    }
}
