use crate::error::PvaError;
use crate::spreadsheet::CellRef;
use crate::store::check_cell;
use crate::store::StoreError;
use crate::store::Table;
use crate::store::TableStore;

/// Grid store held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    sheets: Vec<Table>,
    named_ranges: Vec<(String, CellRef)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheet(&self, name: &str) -> Result<&Table, StoreError> {
        self.sheets
            .iter()
            .find(|table| table.name == name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_owned()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Table, StoreError> {
        self.sheets
            .iter_mut()
            .find(|table| table.name == name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_owned()))
    }
}

impl TableStore for MemoryStore {
    fn sheet_names(&self) -> Result<Vec<String>, PvaError> {
        Ok(self.sheets.iter().map(|table| table.name.clone()).collect())
    }

    fn ensure(&mut self, sheet: &str, header: &[String]) -> Result<Table, PvaError> {
        if let Ok(table) = self.sheet(sheet) {
            return Ok(table.clone());
        }
        let rows = if header.is_empty() { Vec::new() } else { vec![header.to_vec()] };
        let table = Table::new(sheet, rows);
        self.sheets.push(table.clone());
        Ok(table)
    }

    fn read(&self, sheet: &str) -> Result<Table, PvaError> {
        Ok(self.sheet(sheet)?.clone())
    }

    fn append(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), PvaError> {
        let table = self.sheet_mut(sheet)?;
        let last_row = table.last_row();
        table.rows.truncate(last_row);
        table.rows.extend(rows.iter().cloned());
        Ok(())
    }

    fn clear(&mut self, sheet: &str) -> Result<(), PvaError> {
        self.sheet_mut(sheet)?.rows.truncate(1);
        Ok(())
    }

    fn delete(&mut self, sheet: &str) -> Result<(), PvaError> {
        self.sheets.retain(|table| table.name != sheet);
        self.named_ranges.retain(|(_, cell)| cell.sheet != sheet);
        Ok(())
    }

    fn replace(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), PvaError> {
        match self.sheet_mut(sheet) {
            Ok(table) => table.rows = rows.to_vec(),
            Err(_) => self.sheets.push(Table::new(sheet, rows.to_vec())),
        }
        Ok(())
    }

    fn cell(&self, sheet: &str, row: usize, col: usize) -> Result<String, PvaError> {
        check_cell(sheet, row, col)?;
        Ok(self.sheet(sheet)?.cell(row, col).to_owned())
    }

    fn set_cell(&mut self, sheet: &str, row: usize, col: usize, value: &str) -> Result<(), PvaError> {
        check_cell(sheet, row, col)?;
        let table = self.sheet_mut(sheet)?;
        if table.rows.len() < row {
            table.rows.resize(row, Vec::new());
        }
        let cells = &mut table.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_owned();
        Ok(())
    }

    fn insert_unique(&mut self, sheet: &str, key_col: usize, row: &[String]) -> Result<Option<usize>, PvaError> {
        check_cell(sheet, 1, key_col)?;
        let key = row.get(key_col - 1).map(String::as_str).unwrap_or("");
        let table = self.sheet_mut(sheet)?;
        let exists = table
            .data()
            .iter()
            .any(|cells| cells.get(key_col - 1).map(String::as_str).unwrap_or("") == key);
        if exists {
            return Ok(None);
        }
        let last_row = table.last_row();
        table.rows.truncate(last_row);
        table.rows.push(row.to_vec());
        Ok(Some(last_row + 1))
    }

    fn named_ranges(&self) -> Result<Vec<(String, CellRef)>, PvaError> {
        Ok(self.named_ranges.clone())
    }

    fn named_range(&self, name: &str) -> Result<Option<CellRef>, PvaError> {
        Ok(self
            .named_ranges
            .iter()
            .find(|(range, _)| range == name)
            .map(|(_, cell)| cell.clone()))
    }

    fn set_named_range(&mut self, name: &str, cell: &CellRef) -> Result<(), PvaError> {
        match self.named_ranges.iter_mut().find(|(range, _)| range == name) {
            Some((_, target)) => *target = cell.clone(),
            None => self.named_ranges.push((name.to_owned(), cell.clone())),
        }
        Ok(())
    }
}
