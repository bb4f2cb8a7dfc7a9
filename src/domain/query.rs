//! Rankings query parameters and their cache key form.

use std::fmt;

use super::{CollectionId, EventId};

/// Optional restrictions applied to a rankings query.
///
/// `collection_id` restricts the result to one collection, `event_id`
/// restricts it further to one event (and only the collection owning it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RankingsFilter {
    /// Restrict to this collection.
    pub collection_id: Option<CollectionId>,
    /// Restrict to this event.
    pub event_id: Option<EventId>,
}

/// A single rankings page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankingsQuery {
    page: u32,
    /// Collection and event restrictions.
    pub filter: RankingsFilter,
}

impl RankingsQuery {
    /// Builds a query, clamping `page` into `1..=u32::MAX`.
    #[must_use]
    pub fn new(page: i64, filter: RankingsFilter) -> Self {
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        Self { page, filter }
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Deterministic cache key for this query (without namespace prefix).
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl Default for RankingsQuery {
    fn default() -> Self {
        Self::new(1, RankingsFilter::default())
    }
}

impl fmt::Display for RankingsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page:{}", self.page)?;
        match self.filter.collection_id {
            Some(id) => write!(f, "|collection:{id}")?,
            None => write!(f, "|collection:*")?,
        }
        match self.filter.event_id {
            Some(id) => write!(f, "|event:{id}"),
            None => write!(f, "|event:*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_below_one_is_clamped() {
        assert_eq!(RankingsQuery::new(0, RankingsFilter::default()).page(), 1);
        assert_eq!(RankingsQuery::new(-42, RankingsFilter::default()).page(), 1);
        assert_eq!(RankingsQuery::new(7, RankingsFilter::default()).page(), 7);
    }

    #[test]
    fn huge_page_saturates() {
        let query = RankingsQuery::new(i64::MAX, RankingsFilter::default());
        assert_eq!(query.page(), u32::MAX);
    }

    #[test]
    fn cache_key_is_deterministic_and_filter_sensitive() {
        let collection_id = CollectionId::new();
        let unfiltered = RankingsQuery::new(2, RankingsFilter::default());
        let filtered = RankingsQuery::new(
            2,
            RankingsFilter {
                collection_id: Some(collection_id),
                event_id: None,
            },
        );

        assert_eq!(unfiltered.cache_key(), "page:2|collection:*|event:*");
        assert_eq!(
            filtered.cache_key(),
            format!("page:2|collection:{collection_id}|event:*")
        );
        assert_eq!(filtered.cache_key(), filtered.cache_key());
        assert_ne!(unfiltered.cache_key(), filtered.cache_key());
    }
}
