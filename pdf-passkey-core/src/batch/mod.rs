//! Batch encryption of the PDFs named in a password mapping
//!
//! Entries are processed one after another in mapping order. A missing file
//! is a skip and an encryption error is a failure; neither stops the batch.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdf_passkey::batch::{BatchOptions, BatchProcessor, EntryReport};
//! use pdf_passkey::encryption::StandardEncryptor;
//! use pdf_passkey::mapping::load_mapping;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mapping = load_mapping("passwords.xlsx", None)?;
//!
//! let options = BatchOptions::new(".").with_output_dir("protected");
//! let processor = BatchProcessor::new(options, StandardEncryptor);
//! let summary = processor.execute(&mapping, |report: &EntryReport| println!("{report}"))?;
//!
//! println!("{summary}");
//! assert_eq!(summary.total, summary.succeeded + summary.skipped + summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod progress;
pub mod result;

pub use progress::{BatchReporter, SilentReporter};
pub use result::{BatchSummary, EntryOutcome, EntryReport, FailureKind};

use crate::encryption::{Passwords, PdfEncryptor};
use crate::error::{PasskeyError, Result};
use crate::mapping::{MappingEntry, PasswordMapping};
use crate::resolver::resolve_pdf_path;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Suffix of the sibling file written before an in-place swap
pub const TEMP_SUFFIX: &str = ".tmp_encrypt";

/// Default output directory name
pub const DEFAULT_OUTPUT_DIR: &str = "protected";

/// Where encrypted files are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Into this directory, keeping each file's name
    Directory(PathBuf),
    /// Over the original file, through a temporary sibling and a rename
    InPlace,
}

/// Options for a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory searched for the PDFs named in the mapping
    pub working_dir: PathBuf,
    pub output_mode: OutputMode,
    /// Owner password applied to every file instead of each user password
    pub owner_password: Option<String>,
}

impl BatchOptions {
    /// Options writing to `<working_dir>/protected`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Self {
            output_mode: OutputMode::Directory(working_dir.join(DEFAULT_OUTPUT_DIR)),
            working_dir,
            owner_password: None,
        }
    }

    /// Write into `dir`; relative paths are taken from the working directory
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_mode = OutputMode::Directory(self.working_dir.join(dir));
        self
    }

    /// Overwrite the original files
    pub fn in_place(mut self) -> Self {
        self.output_mode = OutputMode::InPlace;
        self
    }

    pub fn with_owner_password(mut self, owner: Option<String>) -> Self {
        self.owner_password = owner;
        self
    }
}

/// Path of the temporary file used while encrypting `original` in place
pub fn temp_path_for(original: &Path) -> PathBuf {
    let mut name = OsString::from(original.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Runs an encryptor over every entry of a mapping
pub struct BatchProcessor<E> {
    options: BatchOptions,
    encryptor: E,
}

impl<E: PdfEncryptor> BatchProcessor<E> {
    pub fn new(options: BatchOptions, encryptor: E) -> Self {
        Self { options, encryptor }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every entry, reporting each one as it completes.
    ///
    /// Only setup can fail (creating the output directory); per-entry
    /// problems end up in the summary.
    pub fn execute<R: BatchReporter>(
        &self,
        mapping: &PasswordMapping,
        reporter: R,
    ) -> Result<BatchSummary> {
        let start_time = Instant::now();

        if let OutputMode::Directory(dir) = &self.options.output_mode {
            fs::create_dir_all(dir)?;
        }

        let mut summary = BatchSummary::empty();
        for entry in mapping {
            let report = EntryReport {
                name: entry.filename.clone(),
                outcome: self.process_entry(entry),
            };
            reporter.on_entry(&report);
            summary.record(report);
        }

        summary.duration = start_time.elapsed();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch finished"
        );
        Ok(summary)
    }

    fn process_entry(&self, entry: &MappingEntry) -> EntryOutcome {
        let source = match resolve_pdf_path(&self.options.working_dir, &entry.filename) {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(name = %entry.filename, "No PDF found");
                return EntryOutcome::Skipped {
                    reason: "no PDF found".to_string(),
                };
            }
            Err(e) => {
                warn!(name = %entry.filename, error = %e, "Could not list working directory");
                return EntryOutcome::Failed {
                    source: self.options.working_dir.join(&entry.filename),
                    kind: FailureKind::Processing,
                    message: e.to_string(),
                };
            }
        };

        let passwords =
            Passwords::new(entry.password.as_str()).with_owner(self.options.owner_password.clone());

        match self.encrypt_file(&source, &passwords) {
            Ok(output) => {
                info!(source = %source.display(), output = %output.display(), "Encrypted");
                EntryOutcome::Success { source, output }
            }
            Err(e) => {
                let kind = match e {
                    PasskeyError::PasswordRequired => FailureKind::Authentication,
                    _ => FailureKind::Processing,
                };
                warn!(source = %source.display(), error = %e, "Encryption failed");
                EntryOutcome::Failed {
                    source,
                    kind,
                    message: e.to_string(),
                }
            }
        }
    }

    fn encrypt_file(&self, source: &Path, passwords: &Passwords) -> Result<PathBuf> {
        match &self.options.output_mode {
            OutputMode::InPlace => {
                let temp = temp_path_for(source);
                self.encryptor.encrypt(source, &temp, passwords)?;
                fs::rename(&temp, source)?;
                Ok(source.to_path_buf())
            }
            OutputMode::Directory(dir) => {
                let file_name = source.file_name().ok_or_else(|| {
                    PasskeyError::InvalidStructure(format!(
                        "no file name in {}",
                        source.display()
                    ))
                })?;
                let output = dir.join(file_name);
                self.encryptor.encrypt(source, &output, passwords)?;
                Ok(output)
            }
        }
    }
}
