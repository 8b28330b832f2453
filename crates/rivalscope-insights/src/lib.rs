//! RivalScope Insights — the query layer behind the dashboard views.
//!
//! Each view is gathered by one routine that issues independent read-only
//! queries. A failed query is logged and its metric falls back to the zero
//! value, so a view always comes back, possibly empty.

pub mod dashboard;
pub mod detail;
pub mod facets;
pub mod listing;
pub mod market;
pub mod overview;
pub mod projector;
pub mod record;
pub mod search;
pub mod time_window;

use rivalscope_core::{MarketAllowList, RecencySource, Result, RivalScopeConfig};
use rivalscope_store::{Collection, DocumentStore};
use tracing::warn;

pub use dashboard::{load_dashboard, CompetitorSummary, Dashboard, MarketBreakdown};
pub use detail::{load_detail, CompetitorDetail};
pub use facets::{CategoryFacet, FacetAggregator, MarketFacet, QualifiedFacet};
pub use listing::{load_listing, CompetitorListing};
pub use overview::{load_overview, Overview, RecentItem};
pub use projector::{render_value, Cell, Row, RowProjector, PLACEHOLDER};
pub use search::{search, SearchQuery};
pub use time_window::TimeWindow;

/// What every view needs: the competitor collection and how to interpret it.
#[derive(Clone, Copy)]
pub struct QueryContext<'a> {
    pub collection: Collection<'a>,
    pub markets: &'a MarketAllowList,
    pub recency: &'a RecencySource,
}

impl<'a> QueryContext<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: &'a RivalScopeConfig) -> Self {
        Self {
            collection: Collection::new(store, &config.collection),
            markets: &config.markets,
            recency: &config.recency,
        }
    }

    pub fn facets(&self) -> FacetAggregator<'a> {
        FacetAggregator::new(self.collection, self.markets)
    }
}

/// Unwrap one query result of a view, logging a failure and substituting the
/// zero value.
pub(crate) fn or_default<T: Default>(what: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to load {}: {}", what, e);
            T::default()
        }
    }
}
