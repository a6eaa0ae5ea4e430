use crate::error::PvaError;
use crate::spreadsheet::cell::Cell;

/// One sheet of a workbook, holding its non-empty cells in row-major order.
pub(crate) struct Sheet {
    pub(crate) name: String,
    pub(crate) cells: Vec<Cell>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            row_upper_bound: None,
            col_upper_bound: None,
        }
    }

    pub(super) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_upper_bound.map(|bound| bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_upper_bound.map(|bound| bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Renders the sheet into a dense grid of display strings anchored at A1.
    ///
    /// Every row is padded to the widest used column; trailing empty rows are dropped.
    pub(crate) fn to_grid(&self, error_as_empty: bool) -> Result<Vec<Vec<String>>, PvaError> {
        let (Some(rows), Some(cols)) = (self.row_upper_bound, self.col_upper_bound) else {
            return Ok(Vec::new());
        };
        let mut grid = vec![vec![String::new(); cols + 1]; rows + 1];
        for cell in &self.cells {
            grid[cell.row][cell.col] = cell.display_value(&self.name, error_as_empty)?;
        }
        while grid.last().map(|row| row.iter().all(String::is_empty)).unwrap_or(false) {
            grid.pop();
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::Text,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("Timing");
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert!(sheet.to_grid(false).unwrap().is_empty());
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("Timing");
        push(&mut sheet, 1, 1, "b2");
        push(&mut sheet, 1, 3, "d2");
        push(&mut sheet, 3, 0, "a4");
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_upper_bound, Some(3));

        let grid = sheet.to_grid(false).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0], vec!["", "", "", ""]);
        assert_eq!(grid[1], vec!["", "b2", "", "d2"]);
        assert_eq!(grid[3], vec!["a4", "", "", ""]);
    }

    #[test]
    fn trailing_blank_rows_are_dropped() {
        let mut sheet = Sheet::new("Offers");
        push(&mut sheet, 0, 0, "Offer ID");
        push(&mut sheet, 2, 0, "");
        let grid = sheet.to_grid(false).unwrap();
        assert_eq!(grid, vec![vec!["Offer ID".to_owned()]]);
    }
}
