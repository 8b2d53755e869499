//! One-shot converter: flat stock table → MongoDB extended-JSON documents
//!
//! Independent of the running service; the output file is meant for
//! `mongoimport` into the `inventory` collection.

use clap::Parser;
use inventario::convert::catalog_to_documents;
use std::fs::File;
use std::path::PathBuf;

/// Convert a flat comma-separated stock table into importable JSON documents
#[derive(Parser, Debug)]
#[command(name = "catalog2docs")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input table (code, product, shelves, floors, packs per line)
    #[arg(default_value = "tabla.txt")]
    input: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let input = match File::open(&args.input) {
        Ok(file) => file,
        Err(e) => {
            log::error!("Failed to open {}: {}", args.input.display(), e);
            std::process::exit(1);
        }
    };

    let result = catalog_to_documents(input);
    if result.skipped > 0 {
        log::warn!("{} malformed line(s) skipped", result.skipped);
    }

    let json = match serde_json::to_string_pretty(&result.documents) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Failed to serialize documents: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(&args.output, json) {
        log::error!("Failed to write {}: {}", args.output.display(), e);
        std::process::exit(1);
    }

    log::info!(
        "Wrote {} document(s) to {}",
        result.documents.len(),
        args.output.display()
    );
}
