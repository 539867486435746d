use std::cmp::Ordering;
use std::fmt;

/// Which fetcher, in declared order, produced a value.
///
/// Ordering is defined entirely by [`SourceRank::rank`]: `Primary` is before `Secondary`, which is
/// before `Tertiary`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceRank {
    Primary,
    Secondary,
    Tertiary,
}

impl SourceRank {
    /// Every rank, lowest first.
    pub const ALL: [SourceRank; 3] = [
        SourceRank::Primary,
        SourceRank::Secondary,
        SourceRank::Tertiary,
    ];

    /// The largest number of fetchers a composer can tag.
    pub const MAX: usize = Self::ALL.len();

    /// The 1-based rank.
    pub const fn rank(self) -> usize {
        match self {
            SourceRank::Primary => 1,
            SourceRank::Secondary => 2,
            SourceRank::Tertiary => 3,
        }
    }

    /// Look up the variant with this 1-based rank.
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.rank() == rank)
    }

    /// Does `self` rank strictly ahead of `other`?
    pub fn is_before(self, other: Self) -> bool {
        self.rank() < other.rank()
    }

    /// Does `self` rank strictly behind `other`?
    pub fn is_after(self, other: Self) -> bool {
        self.rank() > other.rank()
    }

    /// Do both have the same rank?
    pub fn is_equal_to(self, other: Self) -> bool {
        self.rank() == other.rank()
    }

    /// Does `self` rank ahead of, or level with, `other`?
    pub fn is_before_or_equal_to(self, other: Self) -> bool {
        self.rank() <= other.rank()
    }

    /// Does `self` rank behind, or level with, `other`?
    pub fn is_after_or_equal_to(self, other: Self) -> bool {
        self.rank() >= other.rank()
    }
}

impl Ord for SourceRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for SourceRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SourceRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceRank::Primary => "primary",
            SourceRank::Secondary => "secondary",
            SourceRank::Tertiary => "tertiary",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_maps_ranks_to_variants() {
        assert_eq!(SourceRank::from_rank(1), Some(SourceRank::Primary));
        assert_eq!(SourceRank::from_rank(2), Some(SourceRank::Secondary));
        assert_eq!(SourceRank::from_rank(3), Some(SourceRank::Tertiary));
        assert_eq!(SourceRank::from_rank(0), None);
        assert_eq!(SourceRank::from_rank(4), None);
    }

    #[test]
    fn it_is_a_total_order() {
        for a in SourceRank::ALL {
            assert!(a.is_equal_to(a));
            assert!(a.is_before_or_equal_to(a));
            assert!(a.is_after_or_equal_to(a));
            for b in SourceRank::ALL {
                // exactly one of before / equal / after
                let held = [a.is_before(b), a.is_equal_to(b), a.is_after(b)];
                assert_eq!(held.iter().filter(|x| **x).count(), 1);
                assert_eq!(a.is_before(b), b.is_after(a));
                assert_eq!(a.cmp(&b), a.rank().cmp(&b.rank()));
                for c in SourceRank::ALL {
                    if a.is_before(b) && b.is_before(c) {
                        assert!(a.is_before(c));
                    }
                }
            }
        }
        assert!(SourceRank::Primary < SourceRank::Tertiary);
    }
}
