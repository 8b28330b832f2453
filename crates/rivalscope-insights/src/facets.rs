//! Grouped counts over the market dimension and over categories.

use std::collections::HashMap;

use rivalscope_core::{MarketAllowList, Result};
use rivalscope_store::{Accumulator, Collection, Direction, Expr, Filter, Pipeline};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::market::market_expr;

/// Name used for the group of records whose category is null.
pub const UNCATEGORIZED: &str = "Uncategorized";

const MARKET_KEY: &str = "market";
const COUNT: &str = "count";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketFacet {
    pub code: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFacet {
    pub name: String,
    pub count: u64,
}

/// A market facet with sub-counts of records also satisfying each qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifiedFacet {
    pub code: String,
    pub count: u64,
    /// One entry per qualifier, in the order the qualifiers were given.
    pub qualifiers: Vec<u64>,
}

pub struct FacetAggregator<'a> {
    collection: Collection<'a>,
    allow: &'a MarketAllowList,
}

impl<'a> FacetAggregator<'a> {
    pub fn new(collection: Collection<'a>, allow: &'a MarketAllowList) -> Self {
        Self { collection, allow }
    }

    /// Allow-listed market counts over records matching `scope`, highest
    /// count first, ties in first-encounter order.
    pub fn market_facets(&self, scope: &Filter) -> Result<Vec<MarketFacet>> {
        let allowed: Vec<Value> = self
            .allow
            .codes()
            .iter()
            .cloned()
            .map(Value::String)
            .collect();

        let mut pipeline = Pipeline::new();
        if !scope.is_all() {
            pipeline = pipeline.matching(scope.clone());
        }
        let pipeline = pipeline
            .project(MARKET_KEY, market_expr())
            .matching(Filter::In(Expr::field(MARKET_KEY), allowed))
            .group(Expr::field(MARKET_KEY), vec![(COUNT, Accumulator::Count)])
            .sort(COUNT, Direction::Descending);

        let rows = self.collection.aggregate(&pipeline)?;
        let facets: Vec<MarketFacet> = rows
            .iter()
            .filter_map(|row| {
                let code = row.get("_id")?.as_str()?.to_string();
                let count = row.get(COUNT)?.as_u64()?;
                (count > 0).then_some(MarketFacet { code, count })
            })
            .collect();

        debug!("{} market facets in {}", facets.len(), self.collection.name());
        Ok(facets)
    }

    /// Market facets with qualifier sub-counts, each computed as a second
    /// grouped count restricted by the qualifier and merged by code
    /// (0 where the qualifier grouping has no entry).
    pub fn qualified_market_facets(
        &self,
        qualifiers: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<QualifiedFacet>> {
        let mut primary = self.market_facets(&Filter::All)?;
        if let Some(limit) = limit {
            primary.truncate(limit);
        }

        let mut merged: Vec<QualifiedFacet> = primary
            .into_iter()
            .map(|f| QualifiedFacet {
                code: f.code,
                count: f.count,
                qualifiers: Vec::with_capacity(qualifiers.len()),
            })
            .collect();

        for qualifier in qualifiers {
            let secondary: HashMap<String, u64> = self
                .market_facets(qualifier)?
                .into_iter()
                .map(|f| (f.code, f.count))
                .collect();
            for facet in &mut merged {
                facet
                    .qualifiers
                    .push(secondary.get(&facet.code).copied().unwrap_or(0));
            }
        }
        Ok(merged)
    }

    /// Most common `category` values among records that have the attribute.
    pub fn category_facets(&self, limit: usize) -> Result<Vec<CategoryFacet>> {
        let pipeline = Pipeline::new()
            .matching(Filter::exists("category"))
            .group(Expr::field("category"), vec![(COUNT, Accumulator::Count)])
            .sort(COUNT, Direction::Descending)
            .limit(limit);

        let rows = self.collection.aggregate(&pipeline)?;
        Ok(rows
            .iter()
            .map(|row| CategoryFacet {
                name: match row.get("_id") {
                    None | Some(Value::Null) => UNCATEGORIZED.to_string(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                },
                count: row.get(COUNT).and_then(Value::as_u64).unwrap_or(0),
            })
            .collect())
    }
}
