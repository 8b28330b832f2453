//! Free-text search combined with an allow-listed market filter.

use rivalscope_core::{MarketAllowList, Result, PAGE_SIZE};
use rivalscope_store::{Collection, Document, Filter, FindOptions};
use serde::Serialize;
use tracing::debug;

use crate::market::market_filter;

/// Attributes searched by the free-text clause.
pub const SEARCH_FIELDS: [&str; 6] = [
    "company_name",
    "name",
    "website",
    "business_model",
    "category",
    "market",
];

/// A normalized listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    /// Trimmed search text; empty means no text filter.
    pub text: String,
    /// Allow-listed lowercase market code.
    pub market: Option<String>,
}

impl SearchQuery {
    /// Normalize raw inputs. A market code outside the allow-list is dropped.
    pub fn new(text: &str, market: &str, allow: &MarketAllowList) -> Self {
        Self {
            text: text.trim().to_string(),
            market: allow.normalize(market),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.market.is_none()
    }

    /// `(text matches any search field) AND (market matches)`; either side is
    /// omitted when not requested.
    pub fn to_filter(&self) -> Filter {
        let mut clauses = Vec::new();
        if !self.text.is_empty() {
            clauses.push(Filter::or(
                SEARCH_FIELDS
                    .iter()
                    .map(|field| Filter::contains(field, &self.text)),
            ));
        }
        if let Some(code) = &self.market {
            clauses.push(market_filter(code));
        }
        Filter::and(clauses)
    }
}

/// Run `query`, newest records first, at most one page.
pub fn search(collection: Collection<'_>, query: &SearchQuery) -> Result<Vec<Document>> {
    let filter = query.to_filter();
    let docs = collection.find(&filter, &FindOptions::newest_first(PAGE_SIZE))?;
    debug!(
        "search {:?} market={:?}: {} results",
        query.text,
        query.market,
        docs.len()
    );
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalscope_store::Expr;
    use serde_json::{json, Value};

    fn fields(v: Value) -> rivalscope_store::Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let q = SearchQuery::new("  ", "", &MarketAllowList::default());
        assert!(q.is_empty());
        assert_eq!(q.to_filter(), Filter::All);
    }

    #[test]
    fn test_unknown_market_is_ignored() {
        let q = SearchQuery::new("acme", "us", &MarketAllowList::default());
        assert_eq!(q.market, None);
        assert!(matches!(q.to_filter(), Filter::Or(_)));
    }

    #[test]
    fn test_market_only() {
        let q = SearchQuery::new("", "FI", &MarketAllowList::default());
        assert_eq!(q.market.as_deref(), Some("fi"));
        assert!(matches!(q.to_filter(), Filter::Eq(_, _)));
    }

    #[test]
    fn test_text_and_market_are_conjunctive() {
        let q = SearchQuery::new("acme", "de", &MarketAllowList::default());
        let filter = q.to_filter();

        let Filter::And(parts) = &filter else {
            panic!("expected a conjunction, got {:?}", filter);
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Filter::Or(branches) if branches.len() == SEARCH_FIELDS.len()));
        assert!(matches!(&parts[1], Filter::Eq(Expr::ToLower(_), _)));

        let german = fields(json!({"company_name": "Acme GmbH", "country_code": "DE"}));
        let finnish = fields(json!({"company_name": "Acme Inc", "country_code": "FI"}));
        let other_german = fields(json!({"company_name": "Beta AG", "country_code": "DE"}));
        assert!(filter.matches(&german));
        assert!(!filter.matches(&finnish));
        assert!(!filter.matches(&other_german));
    }

    #[test]
    fn test_text_matches_any_field() {
        let q = SearchQuery::new("shop", "", &MarketAllowList::default());
        let filter = q.to_filter();
        assert!(filter.matches(&fields(json!({"website": "https://Shop.example"}))));
        assert!(filter.matches(&fields(json!({"business_model": "e-shop"}))));
        assert!(!filter.matches(&fields(json!({"rank": "shop"}))));
    }
}
