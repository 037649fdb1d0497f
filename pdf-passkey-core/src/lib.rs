//! # pdf-passkey
//!
//! Password-protect a directory of PDF files in one go, using a spreadsheet
//! that lists each file's password.
//!
//! ## Features
//!
//! - **Spreadsheet mappings**: xlsx, xlsm, xls and ods workbooks, with or
//!   without a header row (English and Chinese column names)
//! - **Forgiving filenames**: names may omit `.pdf` and differ in case from
//!   the files on disk
//! - **AES-256 encryption**: standard security handler revision 6
//! - **Safe in-place mode**: originals are replaced by an atomic rename only
//!   after the encrypted copy is complete
//! - **Batch reporting**: per-file outcomes and a final summary; one failure
//!   never stops the batch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_passkey::{load_mapping, BatchOptions, BatchProcessor, SilentReporter, StandardEncryptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mapping = load_mapping("passwords.xlsx", None)?;
//! println!("{} entries", mapping.len());
//!
//! let options = BatchOptions::new(std::env::current_dir()?).in_place();
//! let summary = BatchProcessor::new(options, StandardEncryptor).execute(&mapping, SilentReporter)?;
//! print!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mapping`] - Reading (filename, password) pairs from a workbook
//! - [`resolver`] - Matching declared filenames to files on disk
//! - [`encryption`] - AES-256 PDF encryption
//! - [`batch`] - Running the whole batch and summarising it

pub mod batch;
pub mod encryption;
pub mod error;
pub mod mapping;
pub mod resolver;

pub use batch::{
    BatchOptions, BatchProcessor, BatchReporter, BatchSummary, EntryOutcome, EntryReport,
    FailureKind, OutputMode, SilentReporter,
};
pub use encryption::{encrypt_pdf, Passwords, PdfEncryptor, Permissions, StandardEncryptor};
pub use error::{PasskeyError, Result};
pub use mapping::{
    detect_columns, load_mapping, mapping_from_rows, CellValue, ColumnLayout, MappingEntry,
    PasswordMapping,
};
pub use resolver::resolve_pdf_path;

/// Current version of pdf-passkey
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
