//! Database schema SQL.

/// One table holds every collection; bodies are JSON objects without `_id`.
/// `id` is the lowercase hex identifier, so its text order is creation order.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_records_created ON records(collection, created_at);
"#;

/// Rows at or above an identifier bound whose id is hex of the right width
/// and whose body is a JSON object.
pub const COUNT_RANGE_SQL: &str = r#"
SELECT COUNT(*) FROM records
WHERE collection = ?1 AND id >= ?2
  AND length(id) = 24 AND id NOT GLOB '*[^0-9a-fA-F]*'
  AND json_valid(body) AND json_type(body) = 'object'
"#;
