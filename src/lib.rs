//! Inventario - warehouse inventory & transaction tracker
//!
//! Records inventory items and transaction events in MongoDB and renders
//! Excel reports by filling a spreadsheet template with aggregated totals.

pub mod config;
pub mod convert;
pub mod database;
pub mod error;
pub mod models;
pub mod report;
pub mod total;
pub mod web;

pub use error::{AppError, Result};
pub use models::{InventoryItem, TransactionRecord};
