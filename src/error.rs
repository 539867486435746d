use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// A shareable underlying failure.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Fetch errors.
///
/// Errors are [`Clone`] because a single underlying failure is handed to every caller waiting on
/// the same computation.
#[derive(Clone, Debug, Error)]
pub enum FetchError {
    /// A composer was given no fetchers.
    #[error("Number of fetchers was zero")]
    NoFetchers,
    /// A composer was given more fetchers than there are source ranks.
    #[error("Number of fetchers ({count}) exceeds the number of source ranks ({max})")]
    TooManyFetchers { count: usize, max: usize },
    /// No source rank exists for this 1-based position.
    #[error("No source rank for position {0}")]
    UnknownRank(usize),
    /// The source has no value yet. Try again later.
    #[error("Fetcher not ready")]
    NotReady,
    /// The underlying source failed.
    #[error(transparent)]
    Source(SharedError),
    /// The shared computation ended without producing a result.
    #[error("Delegated fetch was abandoned")]
    Abandoned,
}

impl FetchError {
    /// Wrap an underlying error.
    pub fn wrap<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        FetchError::Source(Arc::new(err))
    }

    /// An underlying failure described only by a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = message.into().into();
        FetchError::Source(Arc::from(boxed))
    }

    /// Is this the transient "no value yet" condition?
    pub fn is_not_ready(&self) -> bool {
        matches!(self, FetchError::NotReady)
    }

    /// Is this a construction problem rather than a runtime failure?
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FetchError::NoFetchers | FetchError::TooManyFetchers { .. } | FetchError::UnknownRank(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_preserves_source_messages() {
        let err = FetchError::msg("C failed");
        assert_eq!(err.to_string(), "C failed");

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FetchError::wrap(io);
        assert_eq!(err.to_string(), "refused");
        assert!(!err.is_not_ready());
    }

    #[test]
    fn it_classifies_errors() {
        assert!(FetchError::NotReady.is_not_ready());
        assert!(FetchError::NoFetchers.is_configuration());
        assert!(FetchError::UnknownRank(4).is_configuration());
        assert!(!FetchError::Abandoned.is_configuration());
    }
}
