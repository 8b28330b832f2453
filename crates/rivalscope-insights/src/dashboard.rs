//! The dashboard: new entrants, per-market activity indicators, top
//! performers and recent activity.

use chrono::{DateTime, Utc};
use rivalscope_core::MarketAllowList;
use rivalscope_store::{Document, Filter, FindOptions};
use serde::Serialize;
use tracing::info;

use crate::record::{
    Badge, Competitor, ACTIVITY_VERY_ACTIVE, CONTENT_ACTIVITY, CONTENT_FREQUENCY, CONTENT_RATING,
    RATING_EXCELLENT, RATING_GOOD, SOCIAL_PRESENCE,
};
use crate::time_window::TimeWindow;
use crate::{or_default, QueryContext};

pub const NEW_THIS_WEEK_LIMIT: usize = 10;
pub const MARKET_LIMIT: usize = 8;
pub const TOP_PERFORMER_LIMIT: usize = 5;
pub const RECENT_ACTIVITY_LIMIT: usize = 8;

const SUMMARY_FIELDS: [&str; 12] = [
    "company_name",
    "name",
    "website",
    "business_model",
    "market",
    "country",
    "locale",
    "region",
    "country_code",
    CONTENT_RATING,
    CONTENT_ACTIVITY,
    SOCIAL_PRESENCE,
];

/// One competitor as shown in dashboard lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorSummary {
    pub id: String,
    pub name: String,
    /// Uppercase market code.
    pub market: Option<String>,
    pub business_model: Option<String>,
    pub website: Option<String>,
    pub content_rating: Option<String>,
    pub activity_level: Option<String>,
    pub update_frequency: Option<String>,
    pub badges: Vec<Badge>,
}

impl CompetitorSummary {
    pub fn from_document(doc: &Document, allow: &MarketAllowList) -> Self {
        let c = Competitor::new(doc);
        Self {
            id: doc.id.to_hex(),
            name: c.display_name().unwrap_or("Unknown").to_string(),
            market: c.market(allow).map(|m| m.to_uppercase()),
            business_model: c.business_model().map(str::to_string),
            website: c.website().map(str::to_string),
            content_rating: c.content_rating().map(str::to_string),
            activity_level: c.activity_level().map(str::to_string),
            update_frequency: doc.get_str(CONTENT_FREQUENCY).map(str::to_string),
            badges: c.badges(),
        }
    }
}

/// Per-market counts with activity indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketBreakdown {
    pub code: String,
    pub count: u64,
    pub new_this_week: u64,
    pub excellent_content: u64,
    pub active_blog: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub total: u64,
    pub has_new_competitors: bool,
    pub new_this_week: Vec<CompetitorSummary>,
    pub new_this_month: u64,
    pub markets: Vec<MarketBreakdown>,
    pub top_performers: Vec<CompetitorSummary>,
    pub recent_activity: Vec<CompetitorSummary>,
}

/// Records rated excellent or good that publish very actively.
pub fn top_performer_filter() -> Filter {
    Filter::and(vec![
        Filter::is_in(CONTENT_RATING, [RATING_EXCELLENT, RATING_GOOD]),
        Filter::eq(CONTENT_ACTIVITY, ACTIVITY_VERY_ACTIVE),
    ])
}

pub fn load_dashboard(ctx: &QueryContext<'_>, now: DateTime<Utc>) -> Dashboard {
    let summarize = |docs: Vec<Document>| -> Vec<CompetitorSummary> {
        docs.iter()
            .map(|d| CompetitorSummary::from_document(d, ctx.markets))
            .collect()
    };

    let total = or_default("total count", ctx.collection.count(&Filter::All));

    let week = TimeWindow::WEEK.filter(now, ctx.recency);
    let new_this_week = summarize(or_default(
        "new this week",
        ctx.collection.find(
            &week,
            &FindOptions::newest_first(NEW_THIS_WEEK_LIMIT).project(SUMMARY_FIELDS),
        ),
    ));

    let month = TimeWindow::MONTH.filter(now, ctx.recency);
    let new_this_month = or_default("new this month", ctx.collection.count(&month));

    let qualifiers = [
        week,
        Filter::eq(CONTENT_RATING, RATING_EXCELLENT),
        Filter::eq(CONTENT_ACTIVITY, ACTIVITY_VERY_ACTIVE),
    ];
    let markets = or_default(
        "market breakdown",
        ctx.facets()
            .qualified_market_facets(&qualifiers, Some(MARKET_LIMIT)),
    )
    .into_iter()
    .map(|f| MarketBreakdown {
        code: f.code.to_uppercase(),
        count: f.count,
        new_this_week: f.qualifiers.first().copied().unwrap_or(0),
        excellent_content: f.qualifiers.get(1).copied().unwrap_or(0),
        active_blog: f.qualifiers.get(2).copied().unwrap_or(0),
    })
    .collect::<Vec<_>>();

    let mut performer_fields = SUMMARY_FIELDS.to_vec();
    performer_fields.push(CONTENT_FREQUENCY);
    let top_performers = summarize(or_default(
        "top performers",
        ctx.collection.find(
            &top_performer_filter(),
            &FindOptions::newest_first(TOP_PERFORMER_LIMIT).project(performer_fields),
        ),
    ));

    let recent_activity = summarize(or_default(
        "recent activity",
        ctx.collection.find(
            &Filter::All,
            &FindOptions::newest_first(RECENT_ACTIVITY_LIMIT).project(SUMMARY_FIELDS),
        ),
    ));

    info!(
        "Dashboard: total={}, new_this_week={}, new_this_month={}, markets={}",
        total,
        new_this_week.len(),
        new_this_month,
        markets.len()
    );

    Dashboard {
        total,
        has_new_competitors: !new_this_week.is_empty(),
        new_this_week,
        new_this_month,
        markets,
        top_performers,
        recent_activity,
    }
}
