use crate::error::FetchError;
use crate::rank::SourceRank;

/// A fetched value together with the rank of the fetcher that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedResponse<V> {
    source: SourceRank,
    value: V,
}

impl<V> TaggedResponse<V> {
    /// Tag `value` with `source`.
    pub fn new(source: SourceRank, value: V) -> Self {
        Self { source, value }
    }

    /// Tag a value with the rank matching its fetcher's 1-based position.
    pub fn from_position(position: usize, value: V) -> Result<Self, FetchError> {
        let source = SourceRank::from_rank(position).ok_or(FetchError::UnknownRank(position))?;
        Ok(Self::new(source, value))
    }

    /// The rank of the fetcher which produced the value.
    pub fn source(&self) -> SourceRank {
        self.source
    }

    /// Borrow the value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Take the value, dropping the rank.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Take the rank and the value.
    pub fn into_parts(self) -> (SourceRank, V) {
        (self.source, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_tags_by_position() {
        let response = TaggedResponse::from_position(2, "test").unwrap();
        assert_eq!(response.source(), SourceRank::Secondary);
        assert_eq!(*response.value(), "test");
        assert_eq!(response.into_parts(), (SourceRank::Secondary, "test"));
    }

    #[test]
    fn it_rejects_unknown_positions() {
        let err = TaggedResponse::from_position(0, ()).unwrap_err();
        assert!(matches!(err, FetchError::UnknownRank(0)));
        let err = TaggedResponse::from_position(4, ()).unwrap_err();
        assert!(matches!(err, FetchError::UnknownRank(4)));
    }
}
