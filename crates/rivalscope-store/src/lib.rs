//! RivalScope Store — document filters, aggregation pipelines and the
//! embedded SQLite backend.

pub mod filter;
pub mod pipeline;
pub mod schema;
pub mod sqlite;
pub mod types;

use rivalscope_core::{ObjectId, Result};

pub use filter::{Expr, Filter};
pub use pipeline::{Accumulator, Direction, Pipeline, Stage};
pub use sqlite::SqliteStore;
pub use types::*;

/// Read-mostly document store shared by every query component.
///
/// Implementations must be safe to share across threads; callers hold one
/// handle per process and pass it in explicitly.
pub trait DocumentStore: Send + Sync {
    fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64>;

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>>;

    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let options = FindOptions {
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find(collection, filter, &options)?.into_iter().next())
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Fields>>;

    /// Insert a document; returns `false` when the identifier already exists.
    fn insert(&self, collection: &str, document: &Document) -> Result<bool>;

    /// Merge top-level attributes into a document. Returns whether it existed.
    fn set_fields(&self, collection: &str, id: ObjectId, updates: &Fields) -> Result<bool>;

    fn list_collections(&self) -> Result<Vec<String>>;

    fn describe(&self) -> StoreInfo;
}

/// A store handle bound to one collection name.
#[derive(Clone, Copy)]
pub struct Collection<'a> {
    store: &'a dyn DocumentStore,
    name: &'a str,
}

impl<'a> Collection<'a> {
    pub fn new(store: &'a dyn DocumentStore, name: &'a str) -> Self {
        Self { store, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn count(&self, filter: &Filter) -> Result<u64> {
        self.store.count_documents(self.name, filter)
    }

    pub fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        self.store.find(self.name, filter, options)
    }

    pub fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        self.store.find_one(self.name, filter)
    }

    pub fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Fields>> {
        self.store.aggregate(self.name, pipeline)
    }

    pub fn set_fields(&self, id: ObjectId, updates: &Fields) -> Result<bool> {
        self.store.set_fields(self.name, id, updates)
    }
}
