//! Data types for stored documents and query options.

use chrono::{DateTime, Utc};
use rivalscope_core::ObjectId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A JSON object: a document body or an aggregation output row.
pub type Fields = serde_json::Map<String, Value>;

/// Name of the identifier attribute as seen by filters and pipelines.
pub const ID_FIELD: &str = "_id";

/// Resolve a dotted path (`content_marketing.overall_rating`) inside an object.
pub fn get_path<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Copy the listed dotted paths into a new object, keeping nesting.
pub fn project_paths(fields: &Fields, paths: &[String]) -> Fields {
    let mut out = Fields::new();
    for path in paths {
        if let Some(value) = get_path(fields, path) {
            let segments: Vec<&str> = path.split('.').collect();
            insert_path(&mut out, &segments, value.clone());
        }
    }
    out
}

fn insert_path(target: &mut Fields, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Fields::new()));
            if !entry.is_object() {
                *entry = Value::Object(Fields::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// A stored record: identifier plus attribute body (without `_id`).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: ObjectId,
    pub fields: Fields,
}

impl Document {
    pub fn new(fields: Fields) -> Self {
        Self {
            id: ObjectId::new(),
            fields,
        }
    }

    pub fn with_id(id: ObjectId, mut fields: Fields) -> Self {
        fields.shift_remove(ID_FIELD);
        Self { id, fields }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.fields, path)
    }

    /// String attribute, `None` for missing, null or non-string values.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.created_at()
    }

    /// The body with `_id` inserted, the shape filters and pipelines see.
    pub fn to_fields(&self) -> Fields {
        let mut out = Fields::with_capacity(self.fields.len() + 1);
        out.insert(ID_FIELD.to_string(), Value::String(self.id.to_hex()));
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Result ordering for `find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Insertion order.
    #[default]
    Natural,
    IdAscending,
    /// Most recently created first.
    IdDescending,
}

/// Options for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: SortOrder,
    pub limit: Option<usize>,
    /// Dotted paths to keep; `None` returns whole documents.
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    pub fn newest_first(limit: usize) -> Self {
        Self {
            sort: SortOrder::IdDescending,
            limit: Some(limit),
            projection: None,
        }
    }

    pub fn project<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(paths.into_iter().map(Into::into).collect());
        self
    }
}

/// Backend diagnostics for the db-info report.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub backend: String,
    pub db_path: String,
    pub db_size_mb: f64,
    pub collections: Vec<String>,
    pub healthy: bool,
}
