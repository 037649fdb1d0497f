//! Workbook access through calamine

use super::{mapping_from_rows, CellValue, PasswordMapping};
use crate::error::{PasskeyError, Result};
use calamine::{open_workbook_auto, DataType, Range, Reader};
use std::path::Path;
use tracing::debug;

impl From<&DataType> for CellValue {
    fn from(cell: &DataType) -> Self {
        match cell {
            DataType::Empty => CellValue::Empty,
            DataType::String(s) => CellValue::Text(s.clone()),
            DataType::Float(f) => CellValue::Number(*f),
            DataType::Int(i) => CellValue::Number(*i as f64),
            DataType::Bool(true) => CellValue::Other("True".to_string()),
            DataType::Bool(false) => CellValue::Other("False".to_string()),
            other => CellValue::Other(other.to_string()),
        }
    }
}

/// Rows of a used range, positioned as if the sheet were read from A1.
///
/// Blank leading rows become empty rows and blank leading columns become
/// empty cells, so column indices are absolute sheet columns.
pub fn rows_from_range(range: &Range<DataType>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let leading_cells = vec![CellValue::Empty; start_col as usize];

    let mut rows: Vec<Vec<CellValue>> = (0..start_row).map(|_| Vec::new()).collect();
    rows.extend(range.rows().map(|row| {
        leading_cells
            .iter()
            .cloned()
            .chain(row.iter().map(CellValue::from))
            .collect()
    }));
    rows
}

/// Read every row of a sheet, starting at A1.
///
/// `sheet = None` selects the first sheet of the workbook.
pub fn read_sheet_rows<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Vec<Vec<CellValue>>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PasskeyError::SpreadsheetNotFound(path.to_path_buf()));
    }

    let mut workbook =
        open_workbook_auto(path).map_err(|e| PasskeyError::Spreadsheet(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let sheet_name = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(PasskeyError::SheetNotFound {
                    sheet: name.to_string(),
                    available: sheet_names,
                });
            }
            name.to_string()
        }
        None => sheet_names.first().cloned().ok_or(PasskeyError::NoSheets)?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| PasskeyError::SheetNotFound {
            sheet: sheet_name.clone(),
            available: sheet_names.clone(),
        })?
        .map_err(|e| PasskeyError::Spreadsheet(e.to_string()))?;

    let rows = rows_from_range(&range);

    if rows.is_empty() {
        return Err(PasskeyError::EmptySheet(sheet_name));
    }

    debug!(sheet = %sheet_name, rows = rows.len(), "Read mapping sheet");
    Ok(rows)
}

/// Load a filename to password mapping from a workbook.
///
/// Fails when the file or sheet is missing, the workbook cannot be read, or
/// the sheet has no rows. A sheet whose rows are all dropped yields an empty
/// mapping; deciding whether that is fatal is left to the caller.
pub fn load_mapping<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<PasswordMapping> {
    let rows = read_sheet_rows(path, sheet)?;
    Ok(mapping_from_rows(&rows))
}
