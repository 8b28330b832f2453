//! Display rows: pick attributes per record and render any value as text.

use rivalscope_store::{Document, ID_FIELD};
use serde::Serialize;
use serde_json::Value;

/// Rendered in place of missing or null values.
pub const PLACEHOLDER: &str = "—";

/// Widest table produced when columns are inferred from the data.
pub const MAX_INFERRED_COLUMNS: usize = 6;

/// Columns of the competitor listing.
pub const LISTING_COLUMNS: [&str; 6] = [
    "company_name",
    "market",
    "country_code",
    "dcor_site",
    "rank",
    "type",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: String,
    pub cells: Vec<Cell>,
}

/// Render one attribute value.
///
/// Objects carrying a `url` or `href` render as that link; other objects and
/// arrays fall back to compact JSON.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Object(map)) => {
            let link = ["url", "href"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|v| !v.is_null());
            match link {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => Value::Object(map.clone()).to_string(),
            }
        }
        Some(array @ Value::Array(_)) => array.to_string(),
    }
}

/// Header text for an attribute name.
pub fn column_label(name: &str) -> String {
    name.replace('_', " ")
}

#[derive(Debug, Clone, Default)]
pub struct RowProjector {
    columns: Option<Vec<String>>,
}

impl RowProjector {
    /// Columns inferred from the first record.
    pub fn inferred() -> Self {
        Self { columns: None }
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
        }
    }

    pub fn listing() -> Self {
        Self::with_columns(LISTING_COLUMNS)
    }

    /// The configured columns, or the first record's attribute names
    /// (excluding `_id`) capped at `MAX_INFERRED_COLUMNS`.
    pub fn columns_for(&self, docs: &[Document]) -> Vec<String> {
        if let Some(columns) = &self.columns {
            return columns.clone();
        }
        docs.first()
            .map(|doc| {
                doc.fields
                    .keys()
                    .filter(|k| k.as_str() != ID_FIELD)
                    .take(MAX_INFERRED_COLUMNS)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn project(&self, doc: &Document, columns: &[String]) -> Row {
        Row {
            id: doc.id.to_hex(),
            cells: columns
                .iter()
                .map(|name| Cell {
                    name: name.clone(),
                    value: render_value(doc.get(name)),
                })
                .collect(),
        }
    }

    pub fn project_all(&self, docs: &[Document]) -> (Vec<String>, Vec<Row>) {
        let columns = self.columns_for(docs);
        let rows = docs.iter().map(|d| self.project(d, &columns)).collect();
        (columns, rows)
    }
}
