//! The competitor listing: search results as table rows plus market facets.

use rivalscope_store::Filter;
use serde::Serialize;
use tracing::info;

use crate::facets::MarketFacet;
use crate::projector::{column_label, Row, RowProjector};
use crate::search::{search, SearchQuery};
use crate::{or_default, QueryContext};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompetitorListing {
    pub collection: String,
    pub query: SearchQuery,
    pub columns: Vec<String>,
    pub labels: Vec<String>,
    pub rows: Vec<Row>,
    pub market_facets: Vec<MarketFacet>,
}

pub fn load_listing(ctx: &QueryContext<'_>, query: &SearchQuery) -> CompetitorListing {
    let docs = or_default("competitors", search(ctx.collection, query));
    let (columns, rows) = RowProjector::listing().project_all(&docs);
    let market_facets = or_default("market facets", ctx.facets().market_facets(&Filter::All));

    info!(
        "Listing {}: {} results for {:?} (market={:?})",
        ctx.collection.name(),
        rows.len(),
        query.text,
        query.market
    );

    CompetitorListing {
        collection: ctx.collection.name().to_string(),
        query: query.clone(),
        labels: columns.iter().map(|c| column_label(c)).collect(),
        columns,
        rows,
        market_facets,
    }
}
