//! Single-competitor detail lookup.

use rivalscope_core::ObjectId;
use rivalscope_store::{Document, Filter};
use serde::Serialize;
use tracing::{debug, warn};

use crate::projector::{render_value, Cell};
use crate::record::Competitor;
use crate::QueryContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorDetail {
    pub id: String,
    pub title: String,
    pub website: Option<String>,
    /// Every attribute except `_id`, rendered.
    pub entries: Vec<Cell>,
}

impl CompetitorDetail {
    pub fn from_document(doc: &Document) -> Self {
        let c = Competitor::new(doc);
        Self {
            id: doc.id.to_hex(),
            title: c.display_name().unwrap_or("Competitor").to_string(),
            website: c.website().map(str::to_string),
            entries: doc
                .fields
                .iter()
                .map(|(k, v)| Cell {
                    name: k.clone(),
                    value: render_value(Some(v)),
                })
                .collect(),
        }
    }
}

/// Filter for a detail key: a record identifier, or else a slug.
///
/// A slug matches a record whose `slug` equals it, or, read as
/// `<market>_<name>`, a record whose `market` and `name` contain those parts.
pub fn lookup_filter(key: &str) -> Filter {
    if let Ok(id) = ObjectId::parse_str(key) {
        return Filter::IdEq(id);
    }

    let mut parts = key.split('_');
    let market = parts.next().unwrap_or("");
    let name = parts.next().unwrap_or("");
    Filter::or(vec![
        Filter::eq("slug", key),
        Filter::and(vec![Filter::contains("name", name), Filter::contains("market", market)]),
    ])
}

/// Look up one competitor; `None` when absent or when the store fails.
pub fn load_detail(ctx: &QueryContext<'_>, key: &str) -> Option<CompetitorDetail> {
    match ctx.collection.find_one(&lookup_filter(key)) {
        Ok(Some(doc)) => Some(CompetitorDetail::from_document(&doc)),
        Ok(None) => {
            debug!("No competitor for key {:?}", key);
            None
        }
        Err(e) => {
            warn!("Failed to load competitor {:?}: {}", key, e);
            None
        }
    }
}
