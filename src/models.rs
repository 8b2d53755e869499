//! Document models for the `inventory` and `transactions` collections
//!
//! Both documents carry two identifiers: the database-assigned `_id` and a
//! human-readable advisory `id` generated by best-effort increment (see
//! `database::advisory_successor`). The `_id` is authoritative.

use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

fn one_i64() -> i64 {
    1
}

fn one_f64() -> f64 {
    1.0
}

/// Accepts a string or an integer and yields a string.
///
/// Bulk-imported documents (see the converter) store `id` and `code` as
/// int32; documents written by the server store them as strings. Both must
/// read back.
fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct StringOrInt;

    impl serde::de::Visitor<'_> for StringOrInt {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or an integer")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrInt)
}

/// An inventory item: a product plus its unit-conversion multipliers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,
    /// Advisory id, not guaranteed unique
    #[serde(deserialize_with = "string_or_int")]
    pub id: String,
    #[serde(deserialize_with = "string_or_int")]
    pub code: String,
    pub product: String,
    #[serde(default = "one_i64")]
    pub shelves: i64,
    #[serde(default = "one_i64")]
    pub floors: i64,
    /// Units per pack; may be fractional
    #[serde(default = "one_f64")]
    pub packs: f64,
}

/// A recorded transaction with its computed total quantity
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,
    /// Advisory id, not guaranteed unique
    #[serde(deserialize_with = "string_or_int")]
    pub id: String,
    /// Server-assigned timestamp (Bogota wall clock), never client-supplied
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub product: String,
    #[serde(default, deserialize_with = "string_or_int")]
    pub code: String,
    pub total: f64,
    /// Reference to the inventory item the counts were entered against.
    /// Orphaned references are tolerated (no integrity enforcement).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<ObjectId>,
}

/// Payload for creating an inventory item (advisory id is assigned server-side)
#[derive(Debug, Deserialize)]
pub struct NewInventoryItem {
    pub code: String,
    pub product: String,
    #[serde(default = "one_i64")]
    pub shelves: i64,
    #[serde(default = "one_i64")]
    pub floors: i64,
    #[serde(default = "one_f64")]
    pub packs: f64,
}

/// Partial update for an inventory item; absent fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct InventoryUpdate {
    pub id: Option<String>,
    pub code: Option<String>,
    pub product: Option<String>,
    pub shelves: Option<i64>,
    pub floors: Option<i64>,
    pub packs: Option<f64>,
}

impl InventoryUpdate {
    /// Builds the `$set` body from the fields that were supplied
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(id) = &self.id {
            set.insert("id", id);
        }
        if let Some(code) = &self.code {
            set.insert("code", code);
        }
        if let Some(product) = &self.product {
            set.insert("product", product);
        }
        if let Some(shelves) = self.shelves {
            set.insert("shelves", shelves);
        }
        if let Some(floors) = self.floors {
            set.insert("floors", floors);
        }
        if let Some(packs) = self.packs {
            set.insert("packs", packs);
        }
        set
    }
}

/// Payload for recording a transaction.
///
/// `inventory` selects the item whose multipliers convert the entered counts;
/// it accepts either the database id or the advisory id. When no item is
/// selected the multipliers default to 1 and `product`/`code` must be given
/// manually.
#[derive(Debug, Default, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub inventory: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub shelves: f64,
    #[serde(default)]
    pub floors: f64,
    #[serde(default)]
    pub packs: f64,
    /// Loose units counted in fractions of a pack
    #[serde(default)]
    pub loose: f64,
}

/// Partial update for a transaction. The stored date is never changed.
///
/// When any entered count is present the total is recomputed from the
/// referenced inventory item's multipliers; otherwise an explicit `total`
/// is taken as-is.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionUpdate {
    pub id: Option<String>,
    pub inventory: Option<String>,
    pub product: Option<String>,
    pub total: Option<f64>,
    pub shelves: Option<f64>,
    pub floors: Option<f64>,
    pub packs: Option<f64>,
    pub loose: Option<f64>,
}

impl TransactionUpdate {
    /// True when any raw count was supplied, which forces a recompute
    pub fn has_entered_counts(&self) -> bool {
        self.shelves.is_some()
            || self.floors.is_some()
            || self.packs.is_some()
            || self.loose.is_some()
    }
}

/// One row of the grouped-by-(product, code, inventory) aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedTransaction {
    #[serde(default)]
    pub product: String,
    #[serde(default, deserialize_with = "string_or_int")]
    pub code: String,
    #[serde(default)]
    pub inventory_id: Option<ObjectId>,
    pub total: f64,
    pub count: i64,
    /// Current pack multiplier joined in from the inventory collection
    #[serde(default)]
    pub packs: Option<f64>,
}

/// Result of the per-item "today's totals" aggregation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaySummary {
    #[serde(default)]
    pub total_sum: f64,
    #[serde(default)]
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_item_omits_missing_oid() {
        let item = InventoryItem {
            oid: None,
            id: "1".to_string(),
            code: "101".to_string(),
            product: "Harina".to_string(),
            shelves: 2,
            floors: 3,
            packs: 10.0,
        };
        let doc = bson::to_document(&item).unwrap();
        assert!(!doc.contains_key("_id"));
        assert_eq!(doc.get_str("id").unwrap(), "1");
        assert_eq!(doc.get_f64("packs").unwrap(), 10.0);
    }

    #[test]
    fn inventory_item_multipliers_default_to_one() {
        let doc = bson::doc! {
            "id": "inv_5",
            "code": "101",
            "product": "Harina",
        };
        let item: InventoryItem = bson::from_document(doc).unwrap();
        assert_eq!(item.shelves, 1);
        assert_eq!(item.floors, 1);
        assert_eq!(item.packs, 1.0);
    }

    #[test]
    fn bulk_imported_int_ids_read_back_as_strings() {
        // the converter emits id and code as $numberInt; after mongoimport
        // they come back as int32 and must still deserialize
        let doc = bson::doc! {
            "_id": ObjectId::new(),
            "id": 1_i32,
            "code": 101_i32,
            "product": "Harina",
            "shelves": 2_i64,
            "floors": 3_i64,
            "packs": 30.0,
        };
        let item: InventoryItem = bson::from_document(doc).unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.code, "101");
    }

    #[test]
    fn transaction_with_int_code_reads_back() {
        let doc = bson::doc! {
            "id": "tx_1",
            "date": bson::DateTime::now(),
            "product": "Harina",
            "code": 101_i32,
            "total": 5.0,
        };
        let tx: TransactionRecord = bson::from_document(doc).unwrap();
        assert_eq!(tx.code, "101");
    }

    #[test]
    fn grouped_row_with_int_code_reads_back() {
        let doc = bson::doc! {
            "product": "Harina",
            "code": 101_i32,
            "total": 30.0,
            "count": 3,
        };
        let row: GroupedTransaction = bson::from_document(doc).unwrap();
        assert_eq!(row.code, "101");
    }

    #[test]
    fn transaction_date_round_trips_as_bson_datetime() {
        let date = Utc::now();
        let tx = TransactionRecord {
            oid: None,
            id: "tx_1".to_string(),
            date,
            product: "Harina".to_string(),
            code: "101".to_string(),
            total: 42.5,
            inventory_id: None,
        };
        let doc = bson::to_document(&tx).unwrap();
        // stored as a native BSON datetime, not a string
        assert!(matches!(doc.get("date"), Some(bson::Bson::DateTime(_))));
        let back: TransactionRecord = bson::from_document(doc).unwrap();
        // BSON datetimes carry millisecond precision
        assert_eq!(back.date.timestamp_millis(), date.timestamp_millis());
    }

    #[test]
    fn inventory_update_builds_partial_set() {
        let update = InventoryUpdate {
            product: Some("Azucar".to_string()),
            packs: Some(25.0),
            ..Default::default()
        };
        let set = update.to_set_document();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("product").unwrap(), "Azucar");
        assert!(!set.contains_key("code"));
    }

    #[test]
    fn transaction_update_detects_entered_counts() {
        let empty = TransactionUpdate::default();
        assert!(!empty.has_entered_counts());

        let with_counts = TransactionUpdate {
            loose: Some(0.5),
            ..Default::default()
        };
        assert!(with_counts.has_entered_counts());
    }
}
