//! Market dimension normalization.
//!
//! Every place that reads a record's market (aggregation, filtering, display)
//! goes through `market_expr`, so all of them resolve the same value.

use rivalscope_core::MarketAllowList;
use rivalscope_store::{Document, Expr, Filter};
use serde_json::Value;

/// Attribute names that may carry the market, in precedence order.
pub const MARKET_FIELDS: [&str; 5] = ["market", "country", "locale", "region", "country_code"];

/// First non-null market attribute, lowercased.
pub fn market_expr() -> Expr {
    Expr::first_non_null(MARKET_FIELDS).to_lower()
}

/// The record's normalized market code, if it is allow-listed.
pub fn resolve_market(doc: &Document, allow: &MarketAllowList) -> Option<String> {
    match market_expr().eval(&doc.fields)? {
        Value::String(code) if allow.contains(&code) => Some(code),
        _ => None,
    }
}

/// Records whose normalized market equals `code`.
pub fn market_filter(code: &str) -> Filter {
    Filter::Eq(market_expr(), Value::String(code.to_lowercase()))
}

/// Records whose normalized market is in the allow-list.
pub fn allow_list_filter(allow: &MarketAllowList) -> Filter {
    Filter::In(
        market_expr(),
        allow.codes().iter().cloned().map(Value::String).collect(),
    )
}
