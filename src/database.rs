//! Data access for the `inventory` and `transactions` collections
//!
//! Thin query/insert helpers over the two collections plus the aggregation
//! pipelines for "today's transactions grouped by product/code". All day
//! windows are computed in Bogota time because the warehouse operates there;
//! the server may run in a different timezone, so we must be explicit.

use crate::config;
use crate::error::Result;
use crate::models::{DaySummary, GroupedTransaction, InventoryItem, TransactionRecord};
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::America::Bogota;
use futures_util::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

/// Opens a database handle for the given URI.
///
/// No I/O happens here; the first operation on the handle connects. The
/// handle is cheap to clone and is passed down explicitly (no global state).
pub async fn connect(uri: &str, db_name: &str) -> Result<Database> {
    let mut options = ClientOptions::parse(uri).await?;
    options.server_selection_timeout = Some(std::time::Duration::from_secs(
        config::SERVER_SELECTION_TIMEOUT_SECS,
    ));
    let client = Client::with_options(options)?;
    Ok(client.database(db_name))
}

/// Pings the server; used by the health-check route and at startup
pub async fn check_connection(db: &Database) -> Result<()> {
    db.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

fn inventory_coll(db: &Database) -> mongodb::Collection<InventoryItem> {
    db.collection(config::INVENTORY_COLLECTION)
}

fn transactions_coll(db: &Database) -> mongodb::Collection<TransactionRecord> {
    db.collection(config::TRANSACTIONS_COLLECTION)
}

// ── Document keys ──────────────────────────────────────────────────────────

/// A document identifier: either the database-assigned `_id` or the
/// human-readable advisory `id` field.
///
/// Replaces the "try primary lookup, fall back to advisory" pattern with a
/// single classification done once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocKey {
    Primary(ObjectId),
    Advisory(String),
}

impl DocKey {
    /// Classifies a raw path segment: anything that parses as an ObjectId is
    /// a primary key, everything else is an advisory id.
    pub fn parse(raw: &str) -> DocKey {
        match ObjectId::parse_str(raw) {
            Ok(oid) => DocKey::Primary(oid),
            Err(_) => DocKey::Advisory(raw.to_string()),
        }
    }

    /// The filter document selecting this key
    pub fn filter(&self) -> Document {
        match self {
            DocKey::Primary(oid) => doc! { "_id": oid },
            DocKey::Advisory(id) => doc! { "id": id },
        }
    }
}

// ── Advisory ids ───────────────────────────────────────────────────────────

/// Computes the successor of an advisory id: the trailing digit run is
/// incremented and the prefix kept as-is; ids without trailing digits get a
/// `_1` suffix appended.
pub fn advisory_successor(last_id: &str) -> String {
    let bytes = last_id.as_bytes();
    let mut start = bytes.len();
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == bytes.len() {
        return format!("{}_1", last_id);
    }
    let (prefix, digits) = last_id.split_at(start);
    match digits.parse::<u64>() {
        Ok(n) => format!("{}{}", prefix, n + 1),
        // digit run too long to fit in u64
        Err(_) => format!("{}_1", last_id),
    }
}

/// Reads the advisory id of a stored document. Bulk-imported documents
/// carry int32 ids; anything unreadable counts as an empty id.
fn stored_advisory_id(doc: &Document) -> String {
    match doc.get("id") {
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::Int32(n)) => n.to_string(),
        Some(Bson::Int64(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Suggests the next advisory id for a collection from its last-inserted
/// document.
///
/// Best-effort only: two concurrent submissions can compute the same id.
/// There is no compensating lock; the database `_id` stays authoritative.
/// Any failure falls back to `"1"` rather than blocking the insert.
pub async fn next_advisory_id(db: &Database, collection: &str) -> String {
    let coll = db.collection::<Document>(collection);
    match coll.find_one(doc! {}).sort(doc! { "_id": -1 }).await {
        Ok(Some(last)) => advisory_successor(&stored_advisory_id(&last)),
        Ok(None) => "1".to_string(),
        Err(e) => {
            log::warn!("advisory id lookup failed, falling back to \"1\": {}", e);
            "1".to_string()
        }
    }
}

// ── Inventory CRUD ─────────────────────────────────────────────────────────

pub async fn list_inventory(db: &Database) -> Result<Vec<InventoryItem>> {
    let cursor = inventory_coll(db)
        .find(doc! {})
        .limit(config::INVENTORY_LIST_LIMIT)
        .await?;
    Ok(cursor.try_collect().await?)
}

/// Inserts an item and returns the database-assigned id
pub async fn insert_inventory_item(db: &Database, item: &InventoryItem) -> Result<Bson> {
    let result = inventory_coll(db).insert_one(item).await?;
    Ok(result.inserted_id)
}

pub async fn find_inventory_item(db: &Database, key: &DocKey) -> Result<Option<InventoryItem>> {
    Ok(inventory_coll(db).find_one(key.filter()).await?)
}

/// Applies a partial `$set` overwrite; returns the number of matched documents
pub async fn update_inventory_item(db: &Database, key: &DocKey, set: Document) -> Result<u64> {
    let result = inventory_coll(db)
        .update_one(key.filter(), doc! { "$set": set })
        .await?;
    Ok(result.matched_count)
}

/// Deletes at most one document; returns the deleted count
pub async fn delete_inventory_item(db: &Database, key: &DocKey) -> Result<u64> {
    let result = inventory_coll(db).delete_one(key.filter()).await?;
    Ok(result.deleted_count)
}

// ── Transaction CRUD ───────────────────────────────────────────────────────

/// Lists today's transactions; when today has none, falls back to the most
/// recently inserted documents so the listing is never empty on quiet days.
pub async fn list_transactions(db: &Database) -> Result<Vec<TransactionRecord>> {
    let today = today_transactions(db).await?;
    if !today.is_empty() {
        return Ok(today);
    }
    let cursor = transactions_coll(db)
        .find(doc! {})
        .sort(doc! { "_id": -1 })
        .limit(config::TRANSACTION_LIST_LIMIT)
        .await?;
    Ok(cursor.try_collect().await?)
}

/// Today's raw transaction documents (Bogota day window)
pub async fn today_transactions(db: &Database) -> Result<Vec<TransactionRecord>> {
    let (start, end) = today_bounds();
    let cursor = transactions_coll(db)
        .find(day_filter(start, end))
        .limit(config::REPORT_TRANSACTION_LIMIT)
        .await?;
    Ok(cursor.try_collect().await?)
}

pub async fn insert_transaction(db: &Database, tx: &TransactionRecord) -> Result<Bson> {
    let result = transactions_coll(db).insert_one(tx).await?;
    Ok(result.inserted_id)
}

pub async fn find_transaction(db: &Database, key: &DocKey) -> Result<Option<TransactionRecord>> {
    Ok(transactions_coll(db).find_one(key.filter()).await?)
}

pub async fn update_transaction(db: &Database, key: &DocKey, set: Document) -> Result<u64> {
    let result = transactions_coll(db)
        .update_one(key.filter(), doc! { "$set": set })
        .await?;
    Ok(result.matched_count)
}

pub async fn delete_transaction(db: &Database, key: &DocKey) -> Result<u64> {
    let result = transactions_coll(db).delete_one(key.filter()).await?;
    Ok(result.deleted_count)
}

// ── Day windows ────────────────────────────────────────────────────────────

/// The current Bogota wall-clock time
pub fn bogota_now() -> DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&Bogota)
}

/// `[midnight, next midnight)` of the given instant's local day, in UTC
pub fn day_bounds<Tz: chrono::TimeZone>(now: DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_local = now.with_time(NaiveTime::MIN).single().unwrap_or(now);
    let start = start_local.with_timezone(&Utc);
    (start, start + Duration::days(1))
}

/// Today's day window in Bogota time, as UTC instants
pub fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    day_bounds(bogota_now())
}

fn day_filter(start: DateTime<Utc>, end: DateTime<Utc>) -> Document {
    doc! {
        "date": {
            "$gte": bson::DateTime::from_chrono(start),
            "$lt": bson::DateTime::from_chrono(end),
        }
    }
}

// ── Aggregations ───────────────────────────────────────────────────────────

/// Pipeline: today's transactions grouped by (product, code, inventory
/// reference), totals and counts summed, joined back to inventory for the
/// current pack multiplier, ordered by summed total descending.
pub fn grouped_pipeline(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Document> {
    vec![
        doc! { "$match": day_filter(start, end) },
        doc! { "$group": {
            "_id": {
                "product": "$product",
                "code": "$code",
                "inventory_id": "$inventory_id",
            },
            "total": { "$sum": "$total" },
            "count": { "$sum": 1 },
        }},
        doc! { "$addFields": {
            "product": "$_id.product",
            "code": "$_id.code",
            "inventory_id": "$_id.inventory_id",
        }},
        doc! { "$lookup": {
            "from": config::INVENTORY_COLLECTION,
            "localField": "inventory_id",
            "foreignField": "_id",
            "as": "inventory_doc",
        }},
        doc! { "$unwind": {
            "path": "$inventory_doc",
            "preserveNullAndEmptyArrays": true,
        }},
        doc! { "$project": {
            "_id": 0,
            "product": 1,
            "code": 1,
            "inventory_id": 1,
            "total": 1,
            "count": 1,
            "packs": { "$ifNull": ["$inventory_doc.packs", Bson::Null] },
        }},
        doc! { "$sort": { "total": -1 } },
    ]
}

/// Runs [`grouped_pipeline`] over today's Bogota day window
pub async fn today_grouped_transactions(db: &Database) -> Result<Vec<GroupedTransaction>> {
    let (start, end) = today_bounds();
    let cursor = db
        .collection::<Document>(config::TRANSACTIONS_COLLECTION)
        .aggregate(grouped_pipeline(start, end))
        .with_type::<GroupedTransaction>()
        .await?;
    Ok(cursor.try_collect().await?)
}

/// Pipeline: sum of today's totals for one inventory item, matched by the
/// stored inventory reference or, for older records, by product + code.
pub fn item_summary_pipeline(
    item: &InventoryItem,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Document> {
    let mut any_of = Vec::new();
    if let Some(oid) = item.oid {
        any_of.push(doc! { "inventory_id": oid });
    }
    any_of.push(doc! { "$and": [
        { "product": &item.product },
        { "code": &item.code },
    ]});

    vec![
        doc! { "$match": { "$and": [
            day_filter(start, end),
            { "$or": any_of },
        ]}},
        doc! { "$group": {
            "_id": Bson::Null,
            "total_sum": { "$sum": { "$ifNull": ["$total", 0] } },
            "count": { "$sum": 1 },
        }},
    ]
}

/// Today's summed total and transaction count for one inventory item
pub async fn today_item_summary(db: &Database, item: &InventoryItem) -> Result<DaySummary> {
    let (start, end) = today_bounds();
    let mut cursor = db
        .collection::<Document>(config::TRANSACTIONS_COLLECTION)
        .aggregate(item_summary_pipeline(item, start, end))
        .with_type::<DaySummary>()
        .await?;
    match cursor.try_next().await? {
        Some(summary) => Ok(summary),
        None => Ok(DaySummary::default()),
    }
}
