//! Filename to password mappings read from spreadsheets
//!
//! A mapping sheet holds one PDF per row: a filename column and a password
//! column. The first row may be a header naming those columns in English or
//! Chinese; when it is not, the first two columns are used as-is.
//!
//! Loading is split in two pure phases so each can be checked on its own:
//!
//! 1. [`detect_columns`] classifies the first row and yields a [`ColumnLayout`].
//! 2. [`mapping_from_rows`] applies the layout to every data row.
//!
//! [`load_mapping`] wires both phases to a workbook on disk.

mod loader;

pub use loader::{load_mapping, read_sheet_rows, rows_from_range};

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Header strings recognised for the filename column
pub const FILENAME_ALIASES: &[&str] = &[
    "filename", "file", "name", "pdf", "pdfname", "文件名", "文件", "名称",
];

/// Header strings recognised for the password column
pub const PASSWORD_ALIASES: &[&str] = &["password", "pwd", "pass", "密码"];

/// A single spreadsheet cell, independent of the reader that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell or a cell past the end of its row
    Empty,
    /// Text cell
    Text(String),
    /// Numeric cell (integers included)
    Number(f64),
    /// Any other cell type, kept in its display form
    Other(String),
}

impl CellValue {
    /// Trimmed text form of the cell.
    ///
    /// Integral numbers are written without a fractional part so that a
    /// numeric password such as `123456` does not become `123456.0`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) | CellValue::Other(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
        }
    }

    /// Trimmed, lowercased text used for header matching
    pub fn normalized(&self) -> String {
        self.as_text().to_lowercase()
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_empty()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

fn format_number(n: f64) -> String {
    // 2^53: beyond this f64 no longer holds every integer exactly
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Which columns hold the filename and password, and whether row 0 is a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub filename: usize,
    pub password: usize,
    pub has_header: bool,
}

impl ColumnLayout {
    /// First two columns, no header row
    pub const fn headerless() -> Self {
        Self {
            filename: 0,
            password: 1,
            has_header: false,
        }
    }

    /// Index of the first data row
    pub fn data_start(&self) -> usize {
        usize::from(self.has_header)
    }
}

/// Scan a row for header aliases, returning the matched column indices.
///
/// When several cells match the same alias set the last one wins.
pub fn match_header_aliases(first_row: &[CellValue]) -> (Option<usize>, Option<usize>) {
    let mut filename = None;
    let mut password = None;

    for (index, cell) in first_row.iter().enumerate() {
        let value = cell.normalized();
        if FILENAME_ALIASES.contains(&value.as_str()) {
            filename = Some(index);
        }
        if PASSWORD_ALIASES.contains(&value.as_str()) {
            password = Some(index);
        }
    }

    (filename, password)
}

/// Classify the first row of a sheet.
///
/// Any alias match makes the row a header; a column the header does not name
/// falls back to 0 (filename) or 1 (password).
pub fn detect_columns(first_row: &[CellValue]) -> ColumnLayout {
    match match_header_aliases(first_row) {
        (None, None) => ColumnLayout::headerless(),
        (filename, password) => ColumnLayout {
            filename: filename.unwrap_or(0),
            password: password.unwrap_or(1),
            has_header: true,
        },
    }
}

/// A (filename, password) pair as declared in the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Declared filename, possibly without the `.pdf` extension
    pub filename: String,
    pub password: String,
}

/// Insertion-ordered filename to password map.
///
/// Inserting an existing filename replaces its password but keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasswordMapping {
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

impl PasswordMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry, returning the previous password if any
    pub fn insert(
        &mut self,
        filename: impl Into<String>,
        password: impl Into<String>,
    ) -> Option<String> {
        let filename = filename.into();
        let password = password.into();

        match self.index.get(&filename) {
            Some(&position) => Some(std::mem::replace(
                &mut self.entries[position].password,
                password,
            )),
            None => {
                self.index.insert(filename.clone(), self.entries.len());
                self.entries.push(MappingEntry { filename, password });
                None
            }
        }
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.index
            .get(filename)
            .map(|&position| self.entries[position].password.as_str())
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.index.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a PasswordMapping {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<F: Into<String>, P: Into<String>> FromIterator<(F, P)> for PasswordMapping {
    fn from_iter<I: IntoIterator<Item = (F, P)>>(iter: I) -> Self {
        let mut mapping = PasswordMapping::new();
        for (filename, password) in iter {
            mapping.insert(filename, password);
        }
        mapping
    }
}

/// Build a mapping from the rows of a sheet.
///
/// Rows with a blank filename or a blank password are dropped without error;
/// a blank password means none was supplied, not an empty one.
pub fn mapping_from_rows(rows: &[Vec<CellValue>]) -> PasswordMapping {
    let Some(first_row) = rows.first() else {
        return PasswordMapping::new();
    };

    let layout = detect_columns(first_row);
    debug!(
        filename_column = layout.filename,
        password_column = layout.password,
        has_header = layout.has_header,
        "Detected mapping columns"
    );

    let mut mapping = PasswordMapping::new();
    for (row_number, row) in rows.iter().enumerate().skip(layout.data_start()) {
        let filename = row
            .get(layout.filename)
            .map(CellValue::as_text)
            .unwrap_or_default();
        let password = row
            .get(layout.password)
            .map(CellValue::as_text)
            .unwrap_or_default();

        if filename.is_empty() || password.is_empty() {
            debug!(row = row_number + 1, "Dropping row without filename or password");
            continue;
        }

        mapping.insert(filename, password);
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(*c)
                }
            })
            .collect()
    }

    #[test]
    fn test_cell_value_text() {
        assert_eq!(CellValue::Empty.as_text(), "");
        assert_eq!(CellValue::from("  report.pdf ").as_text(), "report.pdf");
        assert_eq!(CellValue::Number(123456.0).as_text(), "123456");
        assert_eq!(CellValue::Number(-7.0).as_text(), "-7");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::Other("True".to_string()).as_text(), "True");
        assert!(CellValue::from("   ").is_blank());
    }

    #[test]
    fn test_cell_value_normalized() {
        assert_eq!(CellValue::from(" FileName ").normalized(), "filename");
        assert_eq!(CellValue::from("密码").normalized(), "密码");
    }

    #[test]
    fn test_detect_columns_english_header() {
        let layout = detect_columns(&row(&["Filename", "Password"]));
        assert_eq!(
            layout,
            ColumnLayout {
                filename: 0,
                password: 1,
                has_header: true
            }
        );
        assert_eq!(layout.data_start(), 1);
    }

    #[test]
    fn test_detect_columns_reordered_chinese_header() {
        let layout = detect_columns(&row(&["备注", "密码", "文件名"]));
        assert_eq!(layout.filename, 2);
        assert_eq!(layout.password, 1);
        assert!(layout.has_header);
    }

    #[test]
    fn test_detect_columns_partial_header_defaults() {
        let layout = detect_columns(&row(&["notes", "something", "pwd"]));
        assert_eq!(layout.filename, 0);
        assert_eq!(layout.password, 2);
        assert!(layout.has_header);

        let layout = detect_columns(&row(&["x", "pdf"]));
        assert_eq!(layout.filename, 1);
        assert_eq!(layout.password, 1);
        assert!(layout.has_header);
    }

    #[test]
    fn test_detect_columns_without_header() {
        let layout = detect_columns(&row(&["invoice", "abc123"]));
        assert_eq!(layout, ColumnLayout::headerless());
        assert_eq!(layout.data_start(), 0);
    }

    #[test]
    fn test_detect_columns_last_match_wins() {
        let layout = detect_columns(&row(&["file", "name", "pass"]));
        assert_eq!(layout.filename, 1);
        assert_eq!(layout.password, 2);
    }

    #[test]
    fn test_mapping_from_rows_with_header() {
        let rows = vec![
            row(&["name", "password"]),
            row(&["invoice", "abc123"]),
            row(&["report.pdf", "xyz789"]),
        ];
        let mapping = mapping_from_rows(&rows);

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("invoice"), Some("abc123"));
        assert_eq!(mapping.get("report.pdf"), Some("xyz789"));
        assert!(!mapping.contains("name"));
    }

    #[test]
    fn test_mapping_from_rows_without_header() {
        let rows = vec![row(&["invoice", "abc123"]), row(&["report", "xyz789"])];
        let mapping = mapping_from_rows(&rows);

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("invoice"), Some("abc123"));
    }

    #[test]
    fn test_mapping_drops_blank_cells_and_short_rows() {
        let rows = vec![
            row(&["file", "pwd"]),
            row(&["a", ""]),
            row(&["", "secret"]),
            row(&["b"]),
            vec![],
            row(&["  c  ", "  p  "]),
        ];
        let mapping = mapping_from_rows(&rows);

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("c"), Some("p"));
    }

    #[test]
    fn test_mapping_numeric_passwords() {
        let rows = vec![
            row(&["filename", "password"]),
            vec![CellValue::from("scan"), CellValue::Number(20240101.0)],
        ];
        let mapping = mapping_from_rows(&rows);
        assert_eq!(mapping.get("scan"), Some("20240101"));
    }

    #[test]
    fn test_duplicate_filename_overwrites_in_place() {
        let rows = vec![
            row(&["a", "1"]),
            row(&["b", "2"]),
            row(&["a", "3"]),
        ];
        let mapping = mapping_from_rows(&rows);

        let entries: Vec<_> = mapping
            .iter()
            .map(|e| (e.filename.as_str(), e.password.as_str()))
            .collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_mapping_insert_returns_previous() {
        let mut mapping = PasswordMapping::new();
        assert_eq!(mapping.insert("a", "1"), None);
        assert_eq!(mapping.insert("a", "2"), Some("1".to_string()));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_empty_rows_give_empty_mapping() {
        assert!(mapping_from_rows(&[]).is_empty());
        assert!(mapping_from_rows(&[row(&["filename", "password"])]).is_empty());
    }

    fn header_strategy(aliases: &'static [&'static str]) -> impl Strategy<Value = String> {
        (0..aliases.len(), any::<bool>(), any::<bool>()).prop_map(move |(i, upper, pad)| {
            let mut alias = aliases[i].to_string();
            if upper {
                alias = alias.to_uppercase();
            }
            if pad {
                alias = format!("  {alias} ");
            }
            alias
        })
    }

    proptest! {
        #[test]
        fn prop_header_columns_found_in_any_position(
            filename_alias in header_strategy(FILENAME_ALIASES),
            password_alias in header_strategy(PASSWORD_ALIASES),
            width in 2usize..8,
            fn_col in 0usize..8,
            pw_col in 0usize..8,
        ) {
            let fn_col = fn_col % width;
            let pw_col = pw_col % width;
            prop_assume!(fn_col != pw_col);

            let mut header = vec![CellValue::from("notes"); width];
            header[fn_col] = CellValue::Text(filename_alias);
            header[pw_col] = CellValue::Text(password_alias);

            let layout = detect_columns(&header);
            prop_assert!(layout.has_header);
            prop_assert_eq!(layout.filename, fn_col);
            prop_assert_eq!(layout.password, pw_col);
        }

        #[test]
        fn prop_headerless_rows_use_first_two_columns(
            cells in proptest::collection::vec("[a-z0-9]{3,10}", 1..6)
        ) {
            let first_row: Vec<CellValue> = cells
                .iter()
                .map(|c| CellValue::Text(format!("x{c}")))
                .collect();
            let layout = detect_columns(&first_row);
            prop_assert_eq!(layout, ColumnLayout::headerless());

            let rows = vec![first_row.clone()];
            let mapping = mapping_from_rows(&rows);
            if first_row.len() >= 2 {
                prop_assert_eq!(mapping.len(), 1);
            } else {
                prop_assert!(mapping.is_empty());
            }
        }
    }
}
