//! Flat-table catalog parsing for the one-shot converter
//!
//! Reads the warehouse's comma-separated stock table (code, product,
//! shelves, floors, packs per line) and produces MongoDB extended-JSON
//! documents ready for bulk import. Malformed lines are logged and skipped;
//! the conversion never aborts halfway.

use bson::oid::ObjectId;
use serde_json::{json, Value};
use std::io::Read;

/// Header lines start with this token and are skipped
const HEADER_TOKEN: &str = "CODIGO";

/// Parses the flat table into extended-JSON inventory documents.
///
/// Each document gets a fresh ObjectId and a sequential advisory id starting
/// at 1. Only lines rejected for being short or non-numeric count as skipped;
/// blank lines and the header do not.
pub fn catalog_to_documents<R: Read>(input: R) -> Conversion {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut documents = Vec::new();
    let mut skipped = 0;
    let mut next_id = 1u32;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping unreadable line: {}", e);
                skipped += 1;
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.get(0).is_some_and(|c| c.starts_with(HEADER_TOKEN)) {
            continue;
        }
        if record.len() < 5 {
            log::warn!("Skipping short line: {:?}", record);
            skipped += 1;
            continue;
        }

        let code = record.get(0).unwrap_or("");
        let product = record.get(1).unwrap_or("");
        let numeric = [record.get(2), record.get(3), record.get(4)]
            .map(|f| f.unwrap_or("").parse::<i64>());
        let [shelves, floors, packs] = match numeric {
            [Ok(s), Ok(f), Ok(p)] => [s, f, p],
            _ => {
                log::warn!("Skipping line with non-numeric counts: {:?}", record);
                skipped += 1;
                continue;
            }
        };

        documents.push(json!({
            "_id": { "$oid": ObjectId::new().to_hex() },
            "id": { "$numberInt": next_id.to_string() },
            "code": { "$numberInt": code },
            "product": product,
            "shelves": { "$numberInt": shelves.to_string() },
            "floors": { "$numberInt": floors.to_string() },
            "packs": { "$numberInt": packs.to_string() },
        }));
        next_id += 1;
    }

    Conversion { documents, skipped }
}

/// Outcome of a catalog conversion
#[derive(Debug)]
pub struct Conversion {
    pub documents: Vec<Value>,
    pub skipped: usize,
}
