//! Import tool: loads mongoexport output into the embedded store.
//!
//! Accepts a JSON array or JSON Lines. `_id` values in extended JSON
//! (`{"$oid": "..."}`) or plain hex are kept, so identifier timestamps and
//! therefore the time windows survive the move. Records without `_id` get a
//! freshly generated one.

use std::path::Path;

use rivalscope_core::ObjectId;
use rivalscope_store::{Document, DocumentStore, ID_FIELD};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Result of an import run.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub collection: String,
    pub records: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub generated_ids: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Split file content into records: a top-level array, or one JSON value per line.
pub fn parse_records(content: &str) -> Result<Vec<Value>, String> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => Err("Expected a JSON array".to_string()),
            Err(e) => Err(format!("Invalid JSON array: {}", e)),
        };
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| format!("Line {}: {}", n + 1, e))
        })
        .collect()
}

/// Turn one exported record into a document. Returns whether the identifier
/// was generated.
fn to_document(value: Value) -> Result<(Document, bool), String> {
    let Value::Object(mut fields) = value else {
        return Err("record is not an object".to_string());
    };
    match fields.shift_remove(ID_FIELD) {
        Some(raw) => {
            let id: ObjectId = serde_json::from_value(raw.clone())
                .map_err(|_| format!("unsupported _id {}", raw))?;
            Ok((Document::with_id(id, fields), false))
        }
        None => Ok((Document::new(fields), true)),
    }
}

/// Import `path` into `collection`.
pub fn import_file(store: &dyn DocumentStore, collection: &str, path: &Path) -> ImportReport {
    let mut report = ImportReport {
        collection: collection.to_string(),
        ..Default::default()
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            report
                .errors
                .push(format!("Failed to read {}: {}", path.display(), e));
            return report;
        }
    };

    let records = match parse_records(&content) {
        Ok(r) => r,
        Err(e) => {
            report.errors.push(e);
            return report;
        }
    };
    report.records = records.len();
    info!(
        "Importing {} records from {} into {}",
        records.len(),
        path.display(),
        collection
    );

    for (n, value) in records.into_iter().enumerate() {
        let (doc, generated) = match to_document(value) {
            Ok(d) => d,
            Err(e) => {
                report.skipped += 1;
                report.warnings.push(format!("Record {}: {}", n + 1, e));
                continue;
            }
        };
        if generated {
            report.generated_ids += 1;
        }

        match store.insert(collection, &doc) {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                warn!("Insert failed for {}: {}", doc.id, e);
                report.errors.push(format!("Record {}: {}", n + 1, e));
                if e.is_store_failure() {
                    break;
                }
            }
        }
    }

    info!(
        "Import complete: {} inserted, {} duplicates, {} skipped",
        report.inserted, report.duplicates, report.skipped
    );
    report
}

/// Print an import report to stdout.
pub fn print_report(report: &ImportReport) {
    println!("=== RivalScope Import Report ===");
    println!();
    println!("Collection:         {}", report.collection);
    println!("Records read:       {}", report.records);
    println!("Inserted:           {}", report.inserted);
    println!("Already present:    {}", report.duplicates);
    println!("Generated ids:      {}", report.generated_ids);
    println!("Skipped:            {}", report.skipped);

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("Errors:");
        for e in &report.errors {
            println!("  - {}", e);
        }
    }

    println!();
    if report.errors.is_empty() {
        println!("Status: IMPORTED");
    } else {
        println!("Status: IMPORT FAILED");
    }
}
