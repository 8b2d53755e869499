//! Web layer: JSON API over the two collections plus the report download
//!
//! Every handler follows the same flat policy: database or parsing failures
//! surface as plain-text 500 responses, missing documents as 404. No
//! retries, no structured error codes.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
    routing::get,
    Router,
};
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config;
use crate::database::{self, DocKey};
use crate::models::{
    InventoryItem, InventoryUpdate, NewInventoryItem, NewTransaction, TransactionRecord,
    TransactionUpdate,
};
use crate::report;
use crate::total::{compute_total, EnteredCounts, Multipliers};

/// Shared application state: an explicitly constructed database handle and
/// the template directory, passed down instead of living in a global.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub template_dir: Arc<PathBuf>,
}

type Rejection = (StatusCode, String);

fn db_error(e: impl std::fmt::Display) -> Rejection {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("MongoDB ERROR: {}", e))
}

/// GET /db_check
async fn db_check_handler(State(state): State<AppState>) -> Result<&'static str, Rejection> {
    database::check_connection(&state.db)
        .await
        .map_err(db_error)?;
    Ok("MongoDB OK")
}

// ── Inventory ──────────────────────────────────────────────────────────────

/// GET /api/inventory
async fn list_inventory_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<InventoryItem>>, Rejection> {
    let items = database::list_inventory(&state.db).await.map_err(db_error)?;
    Ok(Json(items))
}

/// POST /api/inventory
async fn create_inventory_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), Rejection> {
    let mut item = InventoryItem {
        oid: None,
        id: database::next_advisory_id(&state.db, config::INVENTORY_COLLECTION).await,
        code: payload.code,
        product: payload.product,
        shelves: payload.shelves,
        floors: payload.floors,
        packs: payload.packs,
    };
    let inserted_id = database::insert_inventory_item(&state.db, &item)
        .await
        .map_err(db_error)?;
    item.oid = inserted_id.as_object_id();
    log::info!("Inserted inventory item id={} _id={:?}", item.id, item.oid);
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/inventory/{id}
async fn update_inventory_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<InventoryUpdate>,
) -> Result<Json<InventoryItem>, Rejection> {
    let key = DocKey::parse(&id);
    let set = payload.to_set_document();
    if set.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no fields to update".to_string()));
    }
    let matched = database::update_inventory_item(&state.db, &key, set)
        .await
        .map_err(db_error)?;
    if matched == 0 {
        return Err((StatusCode::NOT_FOUND, "inventory item not found".to_string()));
    }
    let updated = database::find_inventory_item(&state.db, &key)
        .await
        .map_err(db_error)?
        .ok_or((StatusCode::NOT_FOUND, "inventory item not found".to_string()))?;
    log::info!("Inventory updated: {}", id);
    Ok(Json(updated))
}

/// DELETE /api/inventory/{id}
async fn delete_inventory_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Rejection> {
    let deleted = database::delete_inventory_item(&state.db, &DocKey::parse(&id))
        .await
        .map_err(db_error)?;
    log::info!("Deleted inventory id={} deleted_count={}", id, deleted);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/inventory/{id}/summary
///
/// One inventory item plus today's aggregated total and transaction count.
/// Totals with a fractional part are report-formatted using the item's pack
/// multiplier; integral totals come back as plain numbers.
async fn inventory_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, Rejection> {
    let item = database::find_inventory_item(&state.db, &DocKey::parse(&id))
        .await
        .map_err(db_error)?
        .ok_or((StatusCode::NOT_FOUND, "inventory item not found".to_string()))?;

    let summary = database::today_item_summary(&state.db, &item)
        .await
        .map_err(db_error)?;

    let total = if summary.total_sum.fract() == 0.0 {
        json!(summary.total_sum)
    } else {
        json!(report::format_report_total(summary.total_sum, Some(item.packs)))
    };

    Ok(Json(json!({
        "_id": item.oid.map(|oid| oid.to_hex()),
        "id": item.id,
        "code": item.code,
        "product": item.product,
        "shelves": item.shelves,
        "floors": item.floors,
        "packs": item.packs,
        "transactions_today_sum": total,
        "transactions_today_count": summary.count,
    })))
}

// ── Transactions ───────────────────────────────────────────────────────────

/// GET /api/transactions
async fn list_transactions_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionRecord>>, Rejection> {
    let transactions = database::list_transactions(&state.db)
        .await
        .map_err(db_error)?;
    Ok(Json(transactions))
}

/// POST /api/transactions
///
/// The date is assigned server-side (Bogota wall clock) and the total is
/// derived from the entered counts and the selected item's multipliers.
async fn create_transaction_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewTransaction>,
) -> Result<(StatusCode, Json<TransactionRecord>), Rejection> {
    let inventory = match payload.inventory.as_deref() {
        Some(key) if !key.is_empty() => {
            database::find_inventory_item(&state.db, &DocKey::parse(key))
                .await
                .map_err(db_error)?
        }
        _ => None,
    };

    let multipliers = inventory
        .as_ref()
        .map(Multipliers::from)
        .unwrap_or_default();
    let total = compute_total(
        EnteredCounts {
            shelves: payload.shelves,
            floors: payload.floors,
            packs: payload.packs,
            loose: payload.loose,
        },
        multipliers,
    );

    let product = inventory
        .as_ref()
        .map(|item| item.product.clone())
        .or(payload.product)
        .filter(|p| !p.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "product is required".to_string()))?;
    let code = inventory
        .as_ref()
        .map(|item| item.code.clone())
        .or(payload.code)
        .unwrap_or_default();

    let mut tx = TransactionRecord {
        oid: None,
        id: database::next_advisory_id(&state.db, config::TRANSACTIONS_COLLECTION).await,
        date: database::bogota_now().with_timezone(&chrono::Utc),
        product,
        code,
        total,
        inventory_id: inventory.and_then(|item| item.oid),
    };
    let inserted_id = database::insert_transaction(&state.db, &tx)
        .await
        .map_err(db_error)?;
    tx.oid = inserted_id.as_object_id();
    log::info!(
        "Inserted transaction id={} total={} _id={:?}",
        tx.id,
        tx.total,
        tx.oid
    );
    Ok((StatusCode::CREATED, Json(tx)))
}

/// PUT /api/transactions/{id}
///
/// The stored date is never changed. Supplying any entered count recomputes
/// the total against the referenced item's multipliers; otherwise an
/// explicit `total` is written as-is.
async fn update_transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionRecord>, Rejection> {
    let key = DocKey::parse(&id);
    let existing = database::find_transaction(&state.db, &key)
        .await
        .map_err(db_error)?
        .ok_or((StatusCode::NOT_FOUND, "transaction not found".to_string()))?;

    let inventory = match payload.inventory.as_deref() {
        Some(raw) if !raw.is_empty() => {
            database::find_inventory_item(&state.db, &DocKey::parse(raw))
                .await
                .map_err(db_error)?
        }
        _ => match existing.inventory_id {
            Some(oid) => {
                database::find_inventory_item(&state.db, &DocKey::Primary(oid))
                    .await
                    .map_err(db_error)?
            }
            None => None,
        },
    };

    let mut set = bson::Document::new();
    if let Some(advisory) = &payload.id {
        set.insert("id", advisory);
    }

    if payload.has_entered_counts() {
        let multipliers = inventory
            .as_ref()
            .map(Multipliers::from)
            .unwrap_or_default();
        let total = compute_total(
            EnteredCounts {
                shelves: payload.shelves.unwrap_or(0.0),
                floors: payload.floors.unwrap_or(0.0),
                packs: payload.packs.unwrap_or(0.0),
                loose: payload.loose.unwrap_or(0.0),
            },
            multipliers,
        );
        set.insert("total", total);
    } else if let Some(total) = payload.total {
        set.insert("total", total);
    }

    let product = inventory
        .as_ref()
        .map(|item| item.product.clone())
        .or(payload.product);
    if let Some(product) = product.filter(|p| !p.is_empty()) {
        set.insert("product", product);
    }

    if set.is_empty() {
        return Ok(Json(existing));
    }
    database::update_transaction(&state.db, &key, set)
        .await
        .map_err(db_error)?;

    let updated = database::find_transaction(&state.db, &key)
        .await
        .map_err(db_error)?
        .ok_or((StatusCode::NOT_FOUND, "transaction not found".to_string()))?;
    log::info!("Transaction updated: {}", id);
    Ok(Json(updated))
}

/// DELETE /api/transactions/{id}
async fn delete_transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Rejection> {
    let deleted = database::delete_transaction(&state.db, &DocKey::parse(&id))
        .await
        .map_err(db_error)?;
    log::info!("Deleted transaction id={} deleted_count={}", id, deleted);
    Ok(StatusCode::NO_CONTENT)
}

// ── Report download ────────────────────────────────────────────────────────

/// Report download query parameters
#[derive(Deserialize)]
struct ReportParams {
    #[serde(default = "default_template")]
    template: String,
}

fn default_template() -> String {
    config::DEFAULT_TEMPLATE.to_string()
}

/// GET /report?template={name}
async fn report_handler(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<Response, Rejection> {
    // only plain file names; the template always lives in the template dir
    let name = PathBuf::from(&params.template);
    let Some(file_name) = name.file_name() else {
        return Err((StatusCode::BAD_REQUEST, "invalid template name".to_string()));
    };
    let template_path = state.template_dir.join(file_name);

    let rows = database::today_grouped_transactions(&state.db)
        .await
        .map_err(db_error)?;
    log::info!("Loaded {} aggregated transaction rows for report", rows.len());

    let bytes = report::render_report(&template_path, &rows).map_err(|e| match e {
        crate::AppError::TemplateNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        crate::AppError::SheetNotFound(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    let filename = report::report_filename(database::bogota_now());
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .unwrap())
}

// ── Router ─────────────────────────────────────────────────────────────────

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/db_check", get(db_check_handler))
        .route(
            "/api/inventory",
            get(list_inventory_handler).post(create_inventory_handler),
        )
        .route(
            "/api/inventory/{id}",
            axum::routing::put(update_inventory_handler).delete(delete_inventory_handler),
        )
        .route("/api/inventory/{id}/summary", get(inventory_summary_handler))
        .route(
            "/api/transactions",
            get(list_transactions_handler).post(create_transaction_handler),
        )
        .route(
            "/api/transactions/{id}",
            axum::routing::put(update_transaction_handler).delete(delete_transaction_handler),
        )
        .route("/report", get(report_handler))
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
/// Restrict external exposure with firewall rules or port mapping.
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state() -> AppState {
        // parsing a plain mongodb:// URI does no I/O, so a handle can be
        // built without a running server
        let db = database::connect("mongodb://localhost:27017", "test")
            .await
            .unwrap();
        AppState {
            db,
            template_dir: Arc::new(PathBuf::from("excel_templates")),
        }
    }

    #[tokio::test]
    async fn create_router_builds() {
        let _router = create_router(test_state().await);
    }

    #[tokio::test]
    async fn app_state_is_clone() {
        let state = test_state().await;
        let _copy = state.clone();
    }

    #[test]
    fn report_params_default_template() {
        let params = ReportParams {
            template: default_template(),
        };
        assert_eq!(params.template, config::DEFAULT_TEMPLATE);
    }
}
