//! Per-entry outcomes and run summaries

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Why an entry failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The source PDF is already encrypted with a password we do not have
    Authentication,
    /// Any other error while reading, encrypting or writing
    Processing,
}

/// What happened to one mapping entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// Encrypted successfully
    Success { source: PathBuf, output: PathBuf },

    /// No matching file in the working directory
    Skipped { reason: String },

    /// Encryption failed; the batch carries on
    Failed {
        source: PathBuf,
        kind: FailureKind,
        message: String,
    },
}

impl EntryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EntryOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, EntryOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EntryOutcome::Failed { .. })
    }
}

/// Outcome of one mapping entry, keyed by its declared filename
#[derive(Debug, Clone, PartialEq)]
pub struct EntryReport {
    pub name: String,
    pub outcome: EntryOutcome,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

impl fmt::Display for EntryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            EntryOutcome::Success { source, output } if source == output => {
                write!(f, "[OK] encrypted in place: {}", file_name(source))
            }
            EntryOutcome::Success { source, output } => {
                let dir = output
                    .parent()
                    .map(file_name)
                    .unwrap_or_default();
                write!(f, "[OK] encrypted: {} -> {dir}/", file_name(source))
            }
            EntryOutcome::Skipped { reason } => {
                write!(f, "[SKIP] {reason}: {}", self.name)
            }
            EntryOutcome::Failed {
                source,
                kind: FailureKind::Authentication,
                ..
            } => {
                write!(
                    f,
                    "[FAIL] already encrypted and cannot be opened without its password: {}",
                    file_name(source)
                )
            }
            EntryOutcome::Failed {
                source, message, ..
            } => {
                write!(f, "[FAIL] could not encrypt {}: {message}", file_name(source))
            }
        }
    }
}

/// Counters and per-entry reports for one run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Number of mapping entries processed
    pub total: usize,
    pub succeeded: usize,
    /// Entries whose file could not be found
    pub skipped: usize,
    pub failed: usize,
    /// Reports in processing order
    pub reports: Vec<EntryReport>,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Count an entry's outcome and keep its report
    pub fn record(&mut self, report: EntryReport) {
        self.total += 1;
        match report.outcome {
            EntryOutcome::Success { .. } => self.succeeded += 1,
            EntryOutcome::Skipped { .. } => self.skipped += 1,
            EntryOutcome::Failed { .. } => self.failed += 1,
        }
        self.reports.push(report);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit status: 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }

    pub fn failed_reports(&self) -> impl Iterator<Item = &EntryReport> {
        self.reports.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn output_files(&self) -> Vec<&Path> {
        self.reports
            .iter()
            .filter_map(|r| match &r.outcome {
                EntryOutcome::Success { output, .. } => Some(output.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Format the totals block printed at the end of a run
    pub fn format_report(&self) -> String {
        format!(
            "==== Summary ====\n\
             Total entries: {}\n\
             Succeeded: {}\n\
             Skipped (file not found): {}\n\
             Failed: {}\n",
            self.total, self.succeeded, self.skipped, self.failed
        )
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_report())
    }
}
