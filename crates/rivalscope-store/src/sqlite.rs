//! SQLite-backed document store.
//!
//! Documents are JSON bodies keyed by `(collection, id)`. Predicates and
//! pipelines run in Rust over rows streamed from SQLite; an identifier lower
//! bound found in a filter's conjuncts narrows the scan to an index range.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rivalscope_core::{Error, ObjectId, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::filter::Filter;
use crate::pipeline::Pipeline;
use crate::schema::{COUNT_RANGE_SQL, SCHEMA_SQL};
use crate::types::*;
use crate::DocumentStore;

/// Embedded document store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

/// Row order for a scan.
#[derive(Clone, Copy)]
enum ScanOrder {
    Natural,
    IdAsc,
    IdDesc,
}

impl ScanOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::Natural => "rowid ASC",
            Self::IdAsc => "id ASC",
            Self::IdDesc => "id DESC",
        }
    }
}

impl From<SortOrder> for ScanOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Natural => Self::Natural,
            SortOrder::IdAscending => Self::IdAsc,
            SortOrder::IdDescending => Self::IdDesc,
        }
    }
}

impl SqliteStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/rivalscope.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        let db_path = db_dir.join("rivalscope.db");

        let conn = Connection::open(&db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA cache_size = -16384;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        let collections = store.list_collections()?;
        info!(
            "SqliteStore initialized: {} collections, path={}",
            collections.len(),
            store.db_path_display()
        );
        Ok(store)
    }

    /// A private in-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::StoreUnavailable(format!("Schema init failed: {}", e)))
    }

    fn db_path_display(&self) -> String {
        self.db_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    /// Stream documents of `collection` at or above `lower_bound` in `order`,
    /// handing each to `visit` until it returns `false`. Unparseable bodies are
    /// logged and skipped.
    fn scan<F>(&self, collection: &str, lower_bound: Option<ObjectId>, order: ScanOrder, mut visit: F) -> Result<()>
    where
        F: FnMut(ObjectId, Fields) -> bool,
    {
        let bound = lower_bound.map(|id| id.to_hex()).unwrap_or_default();
        let sql = format!(
            "SELECT id, body FROM records WHERE collection = ?1 AND id >= ?2 ORDER BY {}",
            order.sql()
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let mut rows = stmt.query(params![collection, bound]).map_err(db_err)?;

        while let Some(row) = rows.next().map_err(db_err)? {
            let id_hex: String = row.get(0).map_err(db_err)?;
            let body: String = row.get(1).map_err(db_err)?;
            match parse_record(&id_hex, &body) {
                Ok((id, fields)) => {
                    if !visit(id, fields) {
                        break;
                    }
                }
                Err(e) => warn!("Skipping record in {}: {}", collection, e),
            }
        }
        Ok(())
    }

    /// Count of documents in `collection` at or above `lower_bound`, in SQL.
    /// Rows that `scan` would skip as malformed are not counted.
    fn count_range(&self, collection: &str, lower_bound: Option<ObjectId>) -> Result<u64> {
        let bound = lower_bound.map(|id| id.to_hex()).unwrap_or_default();
        let conn = self.conn.lock();
        let count: i64 = conn
            .prepare_cached(COUNT_RANGE_SQL)
            .map_err(db_err)?
            .query_row(params![collection, bound], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }
}

impl DocumentStore for SqliteStore {
    fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64> {
        match filter {
            Filter::All => return self.count_range(collection, None),
            Filter::IdGte(bound) => return self.count_range(collection, Some(*bound)),
            _ => {}
        }

        let mut count = 0u64;
        self.scan(collection, filter.id_lower_bound(), ScanOrder::Natural, |id, mut fields| {
            fields.insert(ID_FIELD.to_string(), id.to_hex().into());
            if filter.matches(&fields) {
                count += 1;
            }
            true
        })?;
        Ok(count)
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        let limit = options.limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }

        self.scan(collection, filter.id_lower_bound(), options.sort.into(), |id, mut fields| {
            fields.insert(ID_FIELD.to_string(), id.to_hex().into());
            if filter.matches(&fields) {
                let fields = match &options.projection {
                    Some(paths) => project_paths(&fields, paths),
                    None => fields,
                };
                out.push(Document::with_id(id, fields));
            }
            out.len() < limit
        })?;

        debug!("find {}: {} documents", collection, out.len());
        Ok(out)
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Fields>> {
        let lower_bound = pipeline.leading_filter().and_then(Filter::id_lower_bound);
        let mut rows = Vec::new();
        self.scan(collection, lower_bound, ScanOrder::Natural, |id, mut fields| {
            fields.insert(ID_FIELD.to_string(), id.to_hex().into());
            rows.push(fields);
            true
        })?;
        Ok(pipeline.run(rows))
    }

    fn insert(&self, collection: &str, document: &Document) -> Result<bool> {
        let body = serde_json::to_string(&document.fields)?;
        let conn = self.conn.lock();
        let changed = conn
            .prepare_cached(
                "INSERT OR IGNORE INTO records (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(db_err)?
            .execute(params![
                collection,
                document.id.to_hex(),
                body,
                document.id.timestamp() as i64
            ])
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    fn set_fields(&self, collection: &str, id: ObjectId, updates: &Fields) -> Result<bool> {
        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .prepare_cached("SELECT body FROM records WHERE collection = ?1 AND id = ?2")
            .map_err(db_err)?
            .query_row(params![collection, id.to_hex()], |row| row.get(0))
            .optional()
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(false);
        };
        let (_, mut fields) = parse_record(&id.to_hex(), &existing)?;
        for (k, v) in updates {
            if k != ID_FIELD {
                fields.insert(k.clone(), v.clone());
            }
        }

        let body = serde_json::to_string(&fields)?;
        let now = chrono::Utc::now().timestamp();
        let changed = conn
            .execute(
                "UPDATE records SET body = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
                params![body, now, collection, id.to_hex()],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT collection FROM records ORDER BY collection")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        let names = rows.collect::<rusqlite::Result<Vec<String>>>().map_err(db_err)?;
        Ok(names)
    }

    fn describe(&self) -> StoreInfo {
        let healthy = self
            .conn
            .lock()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok();
        let db_size_mb = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        StoreInfo {
            backend: "sqlite".to_string(),
            db_path: self.db_path_display(),
            db_size_mb,
            collections: self.list_collections().unwrap_or_default(),
            healthy,
        }
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::StoreUnavailable(e.to_string())
}

fn parse_record(id_hex: &str, body: &str) -> Result<(ObjectId, Fields)> {
    let id = ObjectId::parse_str(id_hex)?;
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| Error::MalformedRecord {
        id: id_hex.to_string(),
        reason: e.to_string(),
    })?;
    match value {
        serde_json::Value::Object(fields) => Ok((id, fields)),
        other => Err(Error::MalformedRecord {
            id: id_hex.to_string(),
            reason: format!("body is not an object: {}", other),
        }),
    }
}
