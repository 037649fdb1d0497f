//! Resolve declared filenames to PDF files on disk
//!
//! Sheets often name files loosely: without the `.pdf` extension, or with a
//! different case than the file on disk. Resolution tries the exact path
//! first and only falls back to a case-insensitive directory scan when that
//! misses.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

pub const PDF_EXTENSION: &str = ".pdf";

/// Whether `name` ends with `.pdf`, ignoring ASCII case
pub fn has_pdf_extension(name: &str) -> bool {
    let ext_len = PDF_EXTENSION.len();
    name.len() >= ext_len
        && name
            .get(name.len() - ext_len..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
}

/// The filename a declared name should match on disk
pub fn candidate_name(declared: &str) -> String {
    let declared = declared.trim();
    if has_pdf_extension(declared) {
        declared.to_string()
    } else {
        format!("{declared}{PDF_EXTENSION}")
    }
}

/// Find the PDF in `dir` that `declared` refers to.
///
/// Returns `Ok(None)` when nothing matches. An error is only returned when
/// the directory cannot be listed.
pub fn resolve_pdf_path(dir: &Path, declared: &str) -> io::Result<Option<PathBuf>> {
    let declared = declared.trim();
    if declared.is_empty() {
        return Ok(None);
    }

    let base = candidate_name(declared);

    let direct = dir.join(&base);
    if direct.is_file() {
        trace!(path = %direct.display(), "Exact match");
        return Ok(Some(direct));
    }

    find_case_insensitive(dir, &base)
}

fn find_case_insensitive(dir: &Path, base: &str) -> io::Result<Option<PathBuf>> {
    let target = base.to_lowercase();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        if file_name.to_lowercase() == target {
            let path = entry.path();
            if path.is_file() {
                trace!(path = %path.display(), "Case-insensitive match");
                return Ok(Some(path));
            }
        }
    }

    Ok(None)
}
