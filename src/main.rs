//! Inventario server - inventory & transaction tracking over MongoDB
//!
//! Serves the JSON API and the Excel report download.

use clap::Parser;
use inventario::web::{self, AppState};
use inventario::{config, database};
use std::path::PathBuf;
use std::sync::Arc;

/// Inventory & transaction tracking server with Excel report export
#[derive(Parser, Debug)]
#[command(name = "inventario")]
#[command(version, about, long_about = None)]
struct Args {
    /// MongoDB connection URI (falls back to MONGO_URI)
    #[arg(long, default_value_t = config::default_mongo_uri())]
    mongo_uri: String,

    /// Database name (falls back to MONGO_DBNAME)
    #[arg(long, default_value_t = config::default_db_name())]
    db_name: String,

    /// Port for the HTTP API
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Directory holding the xlsx report templates
    #[arg(long, default_value = "excel_templates")]
    templates_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("Starting inventario...");
    log::info!("Database: {} ({})", args.db_name, args.mongo_uri);
    log::info!("Template directory: {}", args.templates_dir.display());

    let db = match database::connect(&args.mongo_uri, &args.db_name).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Invalid MongoDB configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Startup ping; the server still starts when the database is down so
    // /db_check can report the failure.
    match database::check_connection(&db).await {
        Ok(()) => log::info!("MongoDB connection OK"),
        Err(e) => log::error!("MongoDB connection FAILED: {}", e),
    }

    let state = AppState {
        db,
        template_dir: Arc::new(args.templates_dir),
    };

    if let Err(e) = web::serve(state, args.port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
