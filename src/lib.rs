//! Provides safe, asynchronous (tokio based), resilient value fetching.
//!
//! If you have a slow, expensive or unreliable way of fetching a value, the types in this crate
//! help you avoid repeating work, fall back to other sources when one fails, and wait a bounded
//! time for sources which fetch in the background.
//!
//! - [`SingleFlight`] caches the value of a [`Fetcher`]. Many concurrent callers share one
//!   underlying fetch, and failures are never cached.
//! - [`Expiring`] discards a cached value once it reaches a maximum age.
//! - [`NonBlocking`] never waits: it reports [`FetchError::NotReady`] until its background fetch
//!   has a value.
//! - [`Waterfall`] tries fetchers in order and returns the first value found, tagged with the
//!   [`SourceRank`] of the fetcher which produced it.
//! - [`Polling`] sweeps non-blocking fetchers until one has a value or a deadline passes.
//!
//! Composers are configured with a single [`FetcherConfig`].
//!
//! Example 1
//! ```
//! use cascade::from_fn;
//! use cascade::FetchError;
//! use cascade::Fetcher;
//! use cascade::FetcherConfig;
//! use cascade::SourceRank;
//! use cascade::Waterfall;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), FetchError> {
//! let primary = from_fn(|| async { Err::<String, _>(FetchError::msg("primary is down")) });
//! let secondary = from_fn(|| async { Ok::<_, FetchError>("from secondary".to_string()) });
//!
//! let config = FetcherConfig::builder()
//!     .max_age_ms(60_000)
//!     .on_error(|err| eprintln!("recovered from: {err}"))
//!     .build();
//! let waterfall = Waterfall::caching(config, vec![primary.shared(), secondary.shared()])?;
//!
//! let response = waterfall.fetch().await?;
//! assert_eq!(response.source(), SourceRank::Secondary);
//! assert_eq!(response.value(), "from secondary");
//! # Ok(())
//! # }
//! ```
//!
//! Example 2
//! ```
//! use std::time::Duration;
//!
//! use cascade::from_fn;
//! use cascade::FetchError;
//! use cascade::Fetcher;
//! use cascade::FetcherConfig;
//! use cascade::Polling;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), FetchError> {
//! let slow = from_fn(|| async {
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     Ok::<_, FetchError>(42)
//! });
//!
//! let config = FetcherConfig::builder().max_wait_ms(1_000).build();
//! let polling = Polling::non_blocking(config, vec![slow.shared()])?;
//! assert_eq!(polling.fetch().await?.into_value(), 42);
//! # Ok(())
//! # }
//! ```
//!
mod config;
mod error;
mod expiring;
mod fetcher;
mod non_blocking;
mod polling;
mod rank;
mod response;
mod single_flight;
mod waterfall;

pub use crate::config::ErrorCallback;
pub use crate::config::FetcherConfig;
pub use crate::config::FetcherConfigBuilder;
pub use crate::error::FetchError;
pub use crate::error::SharedError;
pub use crate::expiring::Expiring;
pub use crate::fetcher::from_fn;
pub use crate::fetcher::FetchFuture;
pub use crate::fetcher::Fetcher;
pub use crate::fetcher::FnFetcher;
pub use crate::fetcher::MultiFetcher;
pub use crate::fetcher::SharedFetcher;
pub use crate::fetcher::Values;
pub use crate::non_blocking::NonBlocking;
pub use crate::polling::Polling;
pub use crate::rank::SourceRank;
pub use crate::response::TaggedResponse;
pub use crate::single_flight::SingleFlight;
pub use crate::waterfall::Waterfall;
