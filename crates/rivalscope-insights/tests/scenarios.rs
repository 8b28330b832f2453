use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rivalscope_core::{Error, ObjectId, Result, RivalScopeConfig};
use rivalscope_insights::{
    load_dashboard, load_detail, load_listing, load_overview, search, Dashboard, MarketFacet,
    Overview, QueryContext, SearchQuery, TimeWindow,
};
use rivalscope_store::{
    Document, DocumentStore, Fields, Filter, FindOptions, Pipeline, SqliteStore, StoreInfo,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const COLLECTION: &str = "competitors";

fn test_config() -> (RivalScopeConfig, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = RivalScopeConfig::from_env(dir.path()).unwrap();
    config.collection = COLLECTION.to_string();
    config.recency = Default::default();
    (config, dir)
}

fn fields(v: Value) -> Fields {
    v.as_object().cloned().unwrap()
}

/// Insert `bodies` with identifiers one second apart starting at `start`, in order.
fn seed(store: &SqliteStore, start: u32, bodies: Vec<Value>) -> Vec<ObjectId> {
    bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| {
            let id = ObjectId::from_timestamp(start + i as u32);
            store
                .insert(COLLECTION, &Document::with_id(id, fields(body)))
                .unwrap();
            id
        })
        .collect()
}

fn facet(code: &str, count: u64) -> MarketFacet {
    MarketFacet {
        code: code.to_string(),
        count,
    }
}

#[test]
fn test_empty_collection_views() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    let ctx = QueryContext::new(&store, &config);

    let overview = load_overview(&ctx, Utc::now());
    assert_eq!(overview.total, 0);
    assert_eq!(overview.new_this_week, 0);
    assert!(overview.top_category.is_none());
    assert!(overview.recent.is_empty());
    assert!(overview.markets.is_empty());

    let dashboard = load_dashboard(&ctx, Utc::now());
    assert_eq!(dashboard.total, 0);
    assert!(!dashboard.has_new_competitors);
    assert!(dashboard.markets.is_empty());
    assert!(dashboard.top_performers.is_empty());
    assert!(dashboard.recent_activity.is_empty());

    assert!(search(ctx.collection, &SearchQuery::default()).unwrap().is_empty());
    let listing = load_listing(&ctx, &SearchQuery::new("acme", "fi", &config.markets));
    assert!(listing.rows.is_empty());
    assert!(listing.market_facets.is_empty());
}

#[test]
fn test_market_facets_from_country_code() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();

    // SE appears before DE so the 3/3 tie keeps that order.
    let mut bodies = Vec::new();
    for code in ["FI", "SE", "FI", "DE", "SE", "FI", "DE", "SE", "FI", "DE"] {
        bodies.push(json!({"name": format!("{} co", code), "country_code": code}));
    }
    bodies.push(json!({"name": "Stateside", "country_code": "US"}));
    bodies.push(json!({"name": "Nowhere"}));
    seed(&store, 1_700_000_000, bodies);

    let ctx = QueryContext::new(&store, &config);
    let facets = ctx.facets().market_facets(&Filter::All).unwrap();
    assert_eq!(facets, vec![facet("fi", 4), facet("se", 3), facet("de", 3)]);

    let total: u64 = facets.iter().map(|f| f.count).sum();
    assert!(total <= ctx.collection.count(&Filter::All).unwrap());
    assert!(facets.iter().all(|f| config.markets.contains(&f.code)));
}

#[test]
fn test_market_field_shadows_country_code() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    seed(
        &store,
        1_700_000_000,
        vec![
            json!({"market": "Nordics", "country_code": "FI"}),
            json!({"market": "NO", "country_code": "FI"}),
        ],
    );

    let ctx = QueryContext::new(&store, &config);
    let facets = ctx.facets().market_facets(&Filter::All).unwrap();
    assert_eq!(facets, vec![facet("no", 1)]);
}

#[test]
fn test_search_is_conjunctive_with_market() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    seed(
        &store,
        1_700_000_000,
        vec![
            json!({"company_name": "Acme GmbH", "market": "DE"}),
            json!({"company_name": "Acme Inc", "market": "FI"}),
            json!({"company_name": "Bolt AG", "market": "DE"}),
        ],
    );

    let ctx = QueryContext::new(&store, &config);
    let query = SearchQuery::new("acme", "de", &config.markets);
    let docs = search(ctx.collection, &query).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_str("company_name"), Some("Acme GmbH"));

    let listing = load_listing(&ctx, &query);
    assert_eq!(listing.rows.len(), 1);
    assert_eq!(listing.collection, COLLECTION);
    assert_eq!(listing.columns.len(), listing.labels.len());
    assert_eq!(listing.market_facets, vec![facet("de", 2), facet("fi", 1)]);
}

#[test]
fn test_search_ignores_unknown_market() {
    let (config, _dir) = test_config();
    let query = SearchQuery::new("  acme ", "us", &config.markets);
    assert_eq!(query.text, "acme");
    assert_eq!(query.market, None);
}

#[test]
fn test_search_without_criteria_returns_newest_page() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    let bodies = (0..60).map(|i| json!({"name": format!("c{}", i)})).collect();
    seed(&store, 1_700_000_000, bodies);

    let ctx = QueryContext::new(&store, &config);
    let docs = search(ctx.collection, &SearchQuery::default()).unwrap();
    assert_eq!(docs.len(), 50);
    assert_eq!(docs[0].get_str("name"), Some("c59"));
}

#[test]
fn test_time_windows_with_generated_ids() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    for (days_ago, name) in [(40, "old"), (20, "month"), (3, "week"), (0, "today")] {
        let id = ObjectId::from_datetime(now - Duration::days(days_ago));
        store
            .insert(COLLECTION, &Document::with_id(id, fields(json!({"name": name}))))
            .unwrap();
    }

    let ctx = QueryContext::new(&store, &config);
    let week = TimeWindow::WEEK.filter(now, ctx.recency);
    let month = TimeWindow::MONTH.filter(now, ctx.recency);
    assert_eq!(ctx.collection.count(&week).unwrap(), 2);
    assert_eq!(ctx.collection.count(&month).unwrap(), 3);

    let overview = load_overview(&ctx, now);
    assert_eq!(overview.total, 4);
    assert_eq!(overview.new_this_week, 2);
    assert_eq!(overview.recent[0].name, "today");

    let dashboard = load_dashboard(&ctx, now);
    assert!(dashboard.has_new_competitors);
    assert_eq!(dashboard.new_this_month, 3);
    let names: Vec<&str> = dashboard.new_this_week.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["today", "week"]);
}

#[test]
fn test_dashboard_market_breakdown_and_performers() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    let now = Utc::now();
    let start = (now - Duration::days(60)).timestamp() as u32;
    seed(
        &store,
        start,
        vec![
            json!({"name": "A", "market": "FI", "content_marketing": {"overall_rating": "EXCELLENT", "activity_level": "VERY ACTIVE"}}),
            json!({"name": "B", "market": "FI", "content_marketing": {"overall_rating": "GOOD", "activity_level": "VERY ACTIVE"}}),
            json!({"name": "C", "market": "SE", "content_marketing": {"overall_rating": "POOR", "activity_level": "INACTIVE"}}),
        ],
    );

    let ctx = QueryContext::new(&store, &config);
    let dashboard = load_dashboard(&ctx, now);
    assert_eq!(dashboard.total, 3);
    assert!(!dashboard.has_new_competitors);

    let fi = &dashboard.markets[0];
    assert_eq!(fi.code, "FI");
    assert_eq!(fi.count, 2);
    assert_eq!(fi.new_this_week, 0);
    assert_eq!(fi.excellent_content, 1);
    assert_eq!(fi.active_blog, 2);

    let se = &dashboard.markets[1];
    assert_eq!((se.code.as_str(), se.count, se.active_blog), ("SE", 1, 0));

    let performers: Vec<&str> = dashboard.top_performers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(performers, vec!["B", "A"]);
    assert_eq!(dashboard.recent_activity.len(), 3);
}

#[test]
fn test_detail_lookup() {
    let store = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    let ids = seed(
        &store,
        1_700_000_000,
        vec![
            json!({"name": "Acme Oy", "market": "FI", "website": "https://acme.fi"}),
            json!({"name": "Bolt", "market": "SE", "slug": "bolt-se"}),
        ],
    );

    let ctx = QueryContext::new(&store, &config);
    let detail = load_detail(&ctx, &ids[0].to_hex()).unwrap();
    assert_eq!(detail.title, "Acme Oy");
    assert_eq!(detail.website.as_deref(), Some("https://acme.fi"));

    let by_slug = load_detail(&ctx, "bolt-se").unwrap();
    assert_eq!(by_slug.id, ids[1].to_hex());

    let by_parts = load_detail(&ctx, "fi_acme").unwrap();
    assert_eq!(by_parts.id, ids[0].to_hex());

    let missing = ObjectId::from_timestamp(1_600_000_000).to_hex();
    assert!(load_detail(&ctx, &missing).is_none());
}

/// A store whose every operation fails as if the database were unreachable.
struct FailingStore;

impl FailingStore {
    fn down<T>() -> Result<T> {
        Err(Error::StoreUnavailable("connection refused".to_string()))
    }
}

impl DocumentStore for FailingStore {
    fn count_documents(&self, _: &str, _: &Filter) -> Result<u64> {
        Self::down()
    }

    fn find(&self, _: &str, _: &Filter, _: &FindOptions) -> Result<Vec<Document>> {
        Self::down()
    }

    fn aggregate(&self, _: &str, _: &Pipeline) -> Result<Vec<Fields>> {
        Self::down()
    }

    fn insert(&self, _: &str, _: &Document) -> Result<bool> {
        Self::down()
    }

    fn set_fields(&self, _: &str, _: ObjectId, _: &Fields) -> Result<bool> {
        Self::down()
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        Self::down()
    }

    fn describe(&self) -> StoreInfo {
        StoreInfo {
            backend: "failing".to_string(),
            db_path: String::new(),
            db_size_mb: 0.0,
            collections: Vec::new(),
            healthy: false,
        }
    }
}

#[test]
fn test_unavailable_store_yields_empty_views() {
    let store = FailingStore;
    let (config, _dir) = test_config();
    let ctx = QueryContext::new(&store, &config);

    assert_eq!(load_overview(&ctx, Utc::now()), Overview::default());
    assert_eq!(load_dashboard(&ctx, Utc::now()), Dashboard::default());

    let listing = load_listing(&ctx, &SearchQuery::new("acme", "fi", &config.markets));
    assert!(listing.rows.is_empty());
    assert!(listing.market_facets.is_empty());

    assert!(load_detail(&ctx, "fi_acme").is_none());
}

/// A seeded store whose aggregation pipeline is down while counts and finds work.
struct AggregateDownStore {
    inner: SqliteStore,
}

impl DocumentStore for AggregateDownStore {
    fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.inner.count_documents(collection, filter)
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>> {
        self.inner.find(collection, filter, options)
    }

    fn aggregate(&self, _: &str, _: &Pipeline) -> Result<Vec<Fields>> {
        FailingStore::down()
    }

    fn insert(&self, collection: &str, doc: &Document) -> Result<bool> {
        self.inner.insert(collection, doc)
    }

    fn set_fields(&self, collection: &str, id: ObjectId, fields: &Fields) -> Result<bool> {
        self.inner.set_fields(collection, id, fields)
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        self.inner.list_collections()
    }

    fn describe(&self) -> StoreInfo {
        self.inner.describe()
    }
}

#[test]
fn test_failed_aggregation_leaves_other_queries_intact() {
    let inner = SqliteStore::open_in_memory().unwrap();
    let (config, _dir) = test_config();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let start = (now - Duration::days(2)).timestamp() as u32;
    seed(
        &inner,
        start,
        vec![
            json!({"name": "Acme", "market": "FI", "category": "SaaS"}),
            json!({"name": "Bolt", "market": "SE", "category": "Agency"}),
            json!({"name": "Cara", "market": "FI", "category": "SaaS"}),
        ],
    );
    let store = AggregateDownStore { inner };
    let ctx = QueryContext::new(&store, &config);

    let overview = load_overview(&ctx, now);
    assert_eq!(overview.total, 3);
    assert_eq!(overview.new_this_week, 3);
    let recent: Vec<&str> = overview.recent.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(recent, vec!["Cara", "Bolt", "Acme"]);
    assert!(overview.top_categories.is_empty());
    assert!(overview.top_category.is_none());
    assert!(overview.markets.is_empty());

    let listing = load_listing(&ctx, &SearchQuery::new("", "fi", &config.markets));
    assert_eq!(listing.rows.len(), 2);
    assert!(listing.market_facets.is_empty());
}
