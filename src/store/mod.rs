//! # Tabular Config Store
//!
//! Sheets keyed by name, each a grid of strings whose first row is the header.
//! Coordinates are 1-based like a spreadsheet's: row 1 is the header row and
//! column 1 is column A.
mod duckdb;
mod import;
mod memory;

pub use crate::store::duckdb::DuckDbStore;
pub use crate::store::import::import_workbook;
pub use crate::store::memory::MemoryStore;

use crate::error::PvaError;
use crate::schema::ColumnName;
use crate::spreadsheet::CellRef;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sheet {0} not found.")]
    SheetNotFound(String),

    #[error("Cell ({row}, {col}) of sheet {sheet} is outside the grid; rows and columns start at 1")]
    InvalidCell { sheet: String, row: usize, col: usize },
}

/// Snapshot of one sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub name: String,
    /// All rows including the header; short rows are implicitly padded with empty cells.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: &str, rows: Vec<Vec<String>>) -> Self {
        Table {
            name: name.to_owned(),
            rows,
        }
    }

    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows below the header.
    pub fn data(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// 1-based number of the last row holding a non-empty cell, 0 for an empty sheet.
    pub fn last_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|value| !value.is_empty()))
            .map(|index| index + 1)
            .unwrap_or(0)
    }

    pub fn last_column(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// 1-based lookup; cells outside the grid read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        row.checked_sub(1)
            .zip(col.checked_sub(1))
            .and_then(|(row, col)| self.rows.get(row).and_then(|cells| cells.get(col)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Maps every non-blank data row to a [`Record`] using the given column names by position.
    pub fn records(&self, columns: &[String]) -> Vec<Record> {
        self.data()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|value| !value.is_empty()))
            .map(|(index, row)| Record {
                row_number: index + 2,
                fields: columns
                    .iter()
                    .enumerate()
                    .map(|(col, name)| (name.to_owned(), row.get(col).cloned().unwrap_or_default()))
                    .collect(),
            })
            .collect()
    }
}

/// One data row keyed by column name, in column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    row_number: usize,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        row_number: usize,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Record {
            row_number,
            fields: pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
        }
    }

    /// 1-based sheet row the record was read from.
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a schema column; absent columns read as empty.
    pub fn value(&self, column: ColumnName) -> &str {
        self.get(column.label()).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Storage for the sheets of one campaign workbook.
pub trait TableStore {
    /// Names of all sheets in creation order.
    fn sheet_names(&self) -> Result<Vec<String>, PvaError>;

    /// Returns the sheet, creating it with `header` as its first row when absent.
    fn ensure(&mut self, sheet: &str, header: &[String]) -> Result<Table, PvaError>;

    /// Fails with [`StoreError::SheetNotFound`] when the sheet does not exist.
    fn read(&self, sheet: &str) -> Result<Table, PvaError>;

    /// Appends rows below the last non-empty row.
    fn append(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), PvaError>;

    /// Removes every row except the header.
    fn clear(&mut self, sheet: &str) -> Result<(), PvaError>;

    /// Drops the sheet together with the named ranges pointing into it; absent sheets are ignored.
    fn delete(&mut self, sheet: &str) -> Result<(), PvaError>;

    /// Replaces the whole content of a sheet, creating it if needed.
    fn replace(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), PvaError>;

    fn cell(&self, sheet: &str, row: usize, col: usize) -> Result<String, PvaError>;

    fn set_cell(&mut self, sheet: &str, row: usize, col: usize, value: &str) -> Result<(), PvaError>;

    /// Appends `row` unless a data row already holds the same value in column `key_col`.
    ///
    /// Returns the 1-based number of the new row, or `None` if the key exists.
    /// The check and the append happen atomically.
    fn insert_unique(&mut self, sheet: &str, key_col: usize, row: &[String]) -> Result<Option<usize>, PvaError>;

    fn named_ranges(&self) -> Result<Vec<(String, CellRef)>, PvaError>;

    fn named_range(&self, name: &str) -> Result<Option<CellRef>, PvaError>;

    fn set_named_range(&mut self, name: &str, cell: &CellRef) -> Result<(), PvaError>;

    fn read_all(&self, sheets: &[&str]) -> Result<BTreeMap<String, Table>, PvaError> {
        sheets
            .iter()
            .map(|sheet| Ok((sheet.to_string(), self.read(sheet)?)))
            .collect()
    }

    fn exists(&self, sheet: &str) -> Result<bool, PvaError> {
        Ok(self.sheet_names()?.iter().any(|name| name == sheet))
    }
}

pub(crate) fn check_cell(sheet: &str, row: usize, col: usize) -> Result<(), StoreError> {
    if row == 0 || col == 0 {
        Err(StoreError::InvalidCell {
            sheet: sheet.to_owned(),
            row,
            col,
        })
    } else {
        Ok(())
    }
}

/// Behaviour every [`TableStore`] must share, run against each implementation.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    pub(crate) fn ensure_creates_once(store: &mut dyn TableStore) {
        let header = strings(&["Offer ID", "Output AdGroup"]);
        let table = store.ensure("Offers to AdGroups", &header).unwrap();
        assert_eq!(table.header(), header.as_slice());
        store.append("Offers to AdGroups", &[strings(&["1001", "Hamburg"])]).unwrap();

        let again = store.ensure("Offers to AdGroups", &strings(&["Other"])).unwrap();
        assert_eq!(again.header(), header.as_slice());
        assert_eq!(again.data().len(), 1);
        assert_eq!(store.sheet_names().unwrap(), vec!["Offers to AdGroups"]);
    }

    pub(crate) fn missing_sheet_is_an_error(store: &mut dyn TableStore) {
        let error = store.read("Timing").unwrap_err();
        assert!(matches!(error, PvaError::StoreError(StoreError::SheetNotFound(ref name)) if name == "Timing"));
        assert!(store.read_all(&["Timing"]).is_err());
        assert!(store.append("Timing", &[strings(&["x"])]).is_err());
    }

    pub(crate) fn append_and_clear(store: &mut dyn TableStore) {
        store.ensure("Timing", &strings(&["Template Video", "Offset [s]"])).unwrap();
        store.append("Timing", &[strings(&["a.mp4", "1"]), strings(&["b.mp4", "2"])]).unwrap();
        store.append("Timing", &[]).unwrap();
        store.append("Timing", &[strings(&["c.mp4", "3"])]).unwrap();
        let table = store.read("Timing").unwrap();
        assert_eq!(table.last_row(), 4);
        assert_eq!(table.cell(4, 1), "c.mp4");

        store.clear("Timing").unwrap();
        let table = store.read("Timing").unwrap();
        assert_eq!(table.last_row(), 1);
        assert_eq!(table.header(), strings(&["Template Video", "Offset [s]"]).as_slice());

        store.append("Timing", &[strings(&["d.mp4", "4"])]).unwrap();
        assert_eq!(store.cell("Timing", 2, 1).unwrap(), "d.mp4");
    }

    pub(crate) fn cells_are_one_based(store: &mut dyn TableStore) {
        store.ensure("Status", &strings(&["Output AdGroup"])).unwrap();
        store.set_cell("Status", 3, 2, "ENABLED").unwrap();
        assert_eq!(store.cell("Status", 3, 2).unwrap(), "ENABLED");
        assert_eq!(store.cell("Status", 2, 1).unwrap(), "");
        assert_eq!(store.cell("Status", 30, 30).unwrap(), "");
        assert!(store.cell("Status", 0, 1).is_err());
        assert!(store.set_cell("Status", 1, 0, "x").is_err());

        store.set_cell("Status", 3, 2, "").unwrap();
        assert_eq!(store.read("Status").unwrap().last_row(), 1);
    }

    pub(crate) fn insert_unique_refuses_duplicates(store: &mut dyn TableStore) {
        store.ensure("Status", &strings(&["Output AdGroup", "Expected Status"])).unwrap();
        assert_eq!(store.insert_unique("Status", 1, &strings(&["Hamburg"])).unwrap(), Some(2));
        assert_eq!(store.insert_unique("Status", 1, &strings(&["Berlin", "ENABLED"])).unwrap(), Some(3));
        assert_eq!(store.insert_unique("Status", 1, &strings(&["Hamburg", "DISABLED"])).unwrap(), None);
        // The header row never counts as a key.
        assert_eq!(store.insert_unique("Status", 1, &strings(&["Output AdGroup"])).unwrap(), Some(4));
        let table = store.read("Status").unwrap();
        assert_eq!(table.data().len(), 3);
        assert_eq!(table.cell(3, 2), "ENABLED");
    }

    pub(crate) fn named_ranges_follow_sheets(store: &mut dyn TableStore) {
        store.ensure("Base Config", &[]).unwrap();
        let cell = CellRef::new("Base Config", 4, 3);
        store.set_named_range("googleCloud_storageBucket", &cell).unwrap();
        assert_eq!(store.named_range("googleCloud_storageBucket").unwrap(), Some(cell.clone()));
        assert_eq!(store.named_range("youtube_channelId").unwrap(), None);

        let moved = CellRef::new("Base Config", 5, 3);
        store.set_named_range("googleCloud_storageBucket", &moved).unwrap();
        assert_eq!(store.named_ranges().unwrap(), vec![("googleCloud_storageBucket".to_owned(), moved)]);

        store.delete("Base Config").unwrap();
        store.delete("Base Config").unwrap();
        assert!(!store.exists("Base Config").unwrap());
        assert_eq!(store.named_range("googleCloud_storageBucket").unwrap(), None);
    }

    pub(crate) fn replace_overwrites_content(store: &mut dyn TableStore) {
        store.ensure("Offers", &strings(&["Offer ID"])).unwrap();
        store.append("Offers", &[strings(&["1"]), strings(&["2"])]).unwrap();
        store.replace("Offers", &[strings(&["Offer ID", "Title"]), strings(&["3", "Kiwi"])]).unwrap();
        let table = store.read("Offers").unwrap();
        assert_eq!(table.rows, vec![strings(&["Offer ID", "Title"]), strings(&["3", "Kiwi"])]);

        store.replace("Offers Feed", &[strings(&["offerId"])]).unwrap();
        assert!(store.exists("Offers Feed").unwrap());
    }

    /// Runs every check above against fresh stores made by `factory`.
    pub(crate) fn run_all<S: TableStore, F: Fn() -> S>(factory: F) {
        ensure_creates_once(&mut factory());
        missing_sheet_is_an_error(&mut factory());
        append_and_clear(&mut factory());
        cells_are_one_based(&mut factory());
        insert_unique_refuses_duplicates(&mut factory());
        named_ranges_follow_sheets(&mut factory());
        replace_overwrites_content(&mut factory());
    }
}
