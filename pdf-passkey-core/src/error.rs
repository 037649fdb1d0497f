use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasskeyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet not found: {}", .0.display())]
    SpreadsheetNotFound(PathBuf),

    #[error("Sheet not found: {sheet} (available sheets: {})", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Spreadsheet has no sheets")]
    NoSheets,

    #[error("Sheet is empty: {0}")]
    EmptySheet(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF is encrypted and cannot be opened without its password")]
    PasswordRequired,

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),
}

impl PasskeyError {
    /// The spreadsheet or the requested sheet does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PasskeyError::SpreadsheetNotFound(_) | PasskeyError::SheetNotFound { .. }
        )
    }

    /// The spreadsheet exists but its content cannot be used.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            PasskeyError::NoSheets | PasskeyError::EmptySheet(_) | PasskeyError::Spreadsheet(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PasskeyError>;
