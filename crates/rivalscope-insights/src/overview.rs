//! The overview: headline totals, top categories, recent items and markets.

use chrono::{DateTime, Utc};
use rivalscope_store::{Document, Filter, FindOptions};
use serde::Serialize;
use tracing::info;

use crate::facets::{CategoryFacet, MarketFacet};
use crate::projector::PLACEHOLDER;
use crate::record::Competitor;
use crate::time_window::TimeWindow;
use crate::{or_default, QueryContext};

pub const TOP_CATEGORIES: usize = 5;
pub const RECENT_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub website: Option<String>,
}

impl RecentItem {
    fn from_document(doc: &Document) -> Self {
        let c = Competitor::new(doc);
        Self {
            id: doc.id.to_hex(),
            name: c.display_name().unwrap_or("Unnamed").to_string(),
            category: c.category().unwrap_or(PLACEHOLDER).to_string(),
            website: c.website().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total: u64,
    pub new_this_week: u64,
    pub top_category: Option<CategoryFacet>,
    pub top_categories: Vec<CategoryFacet>,
    pub recent: Vec<RecentItem>,
    pub markets: Vec<MarketFacet>,
}

pub fn load_overview(ctx: &QueryContext<'_>, now: DateTime<Utc>) -> Overview {
    let total = or_default("total count", ctx.collection.count(&Filter::All));

    let week = TimeWindow::WEEK.filter(now, ctx.recency);
    let new_this_week = or_default("new this week", ctx.collection.count(&week));

    let top_categories = or_default(
        "top categories",
        ctx.facets().category_facets(TOP_CATEGORIES),
    );

    let recent_opts =
        FindOptions::newest_first(RECENT_ITEMS).project(["company_name", "name", "website", "category"]);
    let recent = or_default("recent items", ctx.collection.find(&Filter::All, &recent_opts))
        .iter()
        .map(RecentItem::from_document)
        .collect();

    let markets = or_default("market facets", ctx.facets().market_facets(&Filter::All));

    info!(
        "Overview: total={}, new_this_week={}, markets={}",
        total,
        new_this_week,
        markets.len()
    );

    Overview {
        total,
        new_this_week,
        top_category: top_categories.first().cloned(),
        top_categories,
        recent,
        markets,
    }
}
