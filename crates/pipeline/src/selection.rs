//! Typed feature selection

use crate::dataset::FeatureId;

/// Predicate over feature identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFilter {
    /// Every feature
    All,
    /// The feature whose identifier equals the given one
    IdEquals(FeatureId),
}

impl FeatureFilter {
    pub fn matches(&self, id: FeatureId) -> bool {
        match self {
            FeatureFilter::All => true,
            FeatureFilter::IdEquals(wanted) => *wanted == id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equals() {
        let filter = FeatureFilter::IdEquals(FeatureId(12));
        assert!(filter.matches(FeatureId(12)));
        assert!(!filter.matches(FeatureId(13)));
        assert!(FeatureFilter::All.matches(FeatureId(-1)));
    }
}
