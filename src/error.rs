//! Error types for inventario

use std::fmt;

/// Unified error type for inventario operations
#[derive(Debug)]
pub enum AppError {
    /// Database operation failed
    Database(mongodb::error::Error),
    /// Report template file does not exist
    TemplateNotFound(String),
    /// Report sheet missing from the template workbook
    SheetNotFound(String),
    /// Reading or writing the spreadsheet failed
    Spreadsheet(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "MongoDB error: {}", e),
            AppError::TemplateNotFound(path) => write!(f, "Template not found: {}", path),
            AppError::SheetNotFound(name) => {
                write!(f, "Sheet '{}' not found in template", name)
            }
            AppError::Spreadsheet(msg) => write!(f, "Spreadsheet error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Database(e) => Some(e),
            AppError::TemplateNotFound(_)
            | AppError::SheetNotFound(_)
            | AppError::Spreadsheet(_) => None,
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Database(err)
    }
}

/// Result alias for inventario operations
pub type Result<T> = std::result::Result<T, AppError>;
