//! Runtime constants and environment-derived defaults

use std::env;

/// Default database name when neither `--db-name` nor `MONGO_DBNAME` is set
pub const DEFAULT_DB_NAME: &str = "InventarioCC";

/// Collection holding inventory items
pub const INVENTORY_COLLECTION: &str = "inventory";

/// Collection holding transaction records
pub const TRANSACTIONS_COLLECTION: &str = "transactions";

/// Default report template file name (inside the templates directory)
pub const DEFAULT_TEMPLATE: &str = "Copia_INVENTARIO_PISO.xlsx";

/// Sheet of the template that carries the report data
pub const REPORT_SHEET: &str = "Datos";

/// First data row of the report sheet (rows above are headers)
pub const REPORT_START_ROW: u32 = 6;

/// Report sheet columns: codes are pre-filled, product and total are written
pub const REPORT_CODE_COL: u32 = 1;
pub const REPORT_PRODUCT_COL: u32 = 2;
pub const REPORT_TOTAL_COL: u32 = 4;

/// Page limit for inventory listings
pub const INVENTORY_LIST_LIMIT: i64 = 300;

/// Fallback page limit for transaction listings (when today has no records)
pub const TRANSACTION_LIST_LIMIT: i64 = 200;

/// Limit for today's transaction documents loaded for listing and reports
pub const REPORT_TRANSACTION_LIMIT: i64 = 1000;

/// MongoDB server selection timeout in seconds
pub const SERVER_SELECTION_TIMEOUT_SECS: u64 = 5;

/// Returns the MongoDB connection URI from `MONGO_URI`, or a localhost default
pub fn default_mongo_uri() -> String {
    env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

/// Returns the database name from `MONGO_DBNAME`, or [`DEFAULT_DB_NAME`]
pub fn default_db_name() -> String {
    env::var("MONGO_DBNAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_name_without_env() {
        // MONGO_DBNAME is not set in the test environment
        if env::var("MONGO_DBNAME").is_err() {
            assert_eq!(default_db_name(), DEFAULT_DB_NAME);
        }
    }
}
