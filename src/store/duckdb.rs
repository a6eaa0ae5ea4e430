//! DuckDB-backed implementation of [`TableStore`].
//!
//! Sheets are stored cell by cell; empty cells are simply absent. Every
//! mutating call runs in its own transaction.
use crate::error::PvaError;
use crate::spreadsheet::CellRef;
use crate::store::check_cell;
use crate::store::StoreError;
use crate::store::Table;
use crate::store::TableStore;
use duckdb::params;
use duckdb::Connection;
use duckdb::Transaction;
use std::path::Path;
use tracing::debug;

/// Idempotent DDL for the store tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS pva_sheets (
    name VARCHAR PRIMARY KEY,
    position BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS pva_cells (
    sheet VARCHAR NOT NULL,
    row_no BIGINT NOT NULL,
    col_no BIGINT NOT NULL,
    value VARCHAR NOT NULL,
    PRIMARY KEY (sheet, row_no, col_no)
);

CREATE TABLE IF NOT EXISTS pva_named_ranges (
    name VARCHAR PRIMARY KEY,
    sheet VARCHAR NOT NULL,
    row_no BIGINT NOT NULL,
    col_no BIGINT NOT NULL
);
";

/// Campaign workbook persisted in a DuckDB database file.
///
/// Create with [`DuckDbStore::open`] for a file or [`DuckDbStore::in_memory`] for tests.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    pub fn open(path: &Path) -> Result<Self, PvaError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        debug!(path = %path.display(), "opened store");
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, PvaError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self { conn })
    }

    /// Runs `operation` inside a transaction, committing only when it succeeds.
    fn write<T, F>(&mut self, operation: F) -> Result<T, PvaError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, PvaError>,
    {
        let tx = self.conn.transaction()?;
        let result = operation(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

fn sheet_exists(conn: &Connection, sheet: &str) -> Result<bool, PvaError> {
    let mut stmt = conn.prepare("SELECT 1 FROM pva_sheets WHERE name = ?")?;
    Ok(stmt.exists(params![sheet])?)
}

fn require_sheet(conn: &Connection, sheet: &str) -> Result<(), PvaError> {
    if sheet_exists(conn, sheet)? {
        Ok(())
    } else {
        Err(StoreError::SheetNotFound(sheet.to_owned()).into())
    }
}

fn create_sheet(conn: &Connection, sheet: &str) -> Result<(), PvaError> {
    conn.execute(
        "INSERT INTO pva_sheets (name, position) SELECT ?, COALESCE(MAX(position), 0) + 1 FROM pva_sheets",
        params![sheet],
    )?;
    Ok(())
}

fn last_row(conn: &Connection, sheet: &str) -> Result<usize, PvaError> {
    let last: i64 = conn.query_row(
        "SELECT COALESCE(MAX(row_no), 0) FROM pva_cells WHERE sheet = ?",
        params![sheet],
        |row| row.get(0),
    )?;
    Ok(last as usize)
}

fn put_cell(conn: &Connection, sheet: &str, row: usize, col: usize, value: &str) -> Result<(), PvaError> {
    if value.is_empty() {
        conn.execute(
            "DELETE FROM pva_cells WHERE sheet = ? AND row_no = ? AND col_no = ?",
            params![sheet, row as i64, col as i64],
        )?;
    } else {
        conn.execute(
            "INSERT OR REPLACE INTO pva_cells (sheet, row_no, col_no, value) VALUES (?, ?, ?, ?)",
            params![sheet, row as i64, col as i64, value],
        )?;
    }
    Ok(())
}

/// Writes `rows` starting at row `first_row`, skipping empty cells.
fn put_rows(conn: &Connection, sheet: &str, first_row: usize, rows: &[Vec<String>]) -> Result<(), PvaError> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO pva_cells (sheet, row_no, col_no, value) VALUES (?, ?, ?, ?)",
    )?;
    for (row_offset, cells) in rows.iter().enumerate() {
        for (col_offset, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                stmt.execute(params![
                    sheet,
                    (first_row + row_offset) as i64,
                    (col_offset + 1) as i64,
                    value
                ])?;
            }
        }
    }
    Ok(())
}

fn read_table(conn: &Connection, sheet: &str) -> Result<Table, PvaError> {
    require_sheet(conn, sheet)?;
    let mut stmt = conn.prepare(
        "SELECT row_no, col_no, value FROM pva_cells WHERE sheet = ? ORDER BY row_no, col_no",
    )?;
    let cells = stmt
        .query_map(params![sheet], |row| {
            Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize, row.get::<_, String>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let rows = cells.iter().map(|(row, _, _)| *row).max().unwrap_or(0);
    let cols = cells.iter().map(|(_, col, _)| *col).max().unwrap_or(0);
    let mut grid = vec![vec![String::new(); cols]; rows];
    for (row, col, value) in cells {
        grid[row - 1][col - 1] = value;
    }
    Ok(Table::new(sheet, grid))
}

impl TableStore for DuckDbStore {
    fn sheet_names(&self) -> Result<Vec<String>, PvaError> {
        let mut stmt = self.conn.prepare("SELECT name FROM pva_sheets ORDER BY position")?;
        let names = stmt
            .query_map(params![], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn ensure(&mut self, sheet: &str, header: &[String]) -> Result<Table, PvaError> {
        self.write(|tx| {
            if sheet_exists(tx, sheet)? {
                debug!(sheet, "sheet already exists");
            } else {
                create_sheet(tx, sheet)?;
                put_rows(tx, sheet, 1, &[header.to_vec()])?;
            }
            read_table(tx, sheet)
        })
    }

    fn read(&self, sheet: &str) -> Result<Table, PvaError> {
        read_table(&self.conn, sheet)
    }

    fn append(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), PvaError> {
        self.write(|tx| {
            require_sheet(tx, sheet)?;
            let first_row = last_row(tx, sheet)? + 1;
            put_rows(tx, sheet, first_row, rows)
        })
    }

    fn clear(&mut self, sheet: &str) -> Result<(), PvaError> {
        self.write(|tx| {
            require_sheet(tx, sheet)?;
            tx.execute("DELETE FROM pva_cells WHERE sheet = ? AND row_no > 1", params![sheet])?;
            Ok(())
        })
    }

    fn delete(&mut self, sheet: &str) -> Result<(), PvaError> {
        self.write(|tx| {
            tx.execute("DELETE FROM pva_cells WHERE sheet = ?", params![sheet])?;
            tx.execute("DELETE FROM pva_named_ranges WHERE sheet = ?", params![sheet])?;
            tx.execute("DELETE FROM pva_sheets WHERE name = ?", params![sheet])?;
            Ok(())
        })
    }

    fn replace(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), PvaError> {
        self.write(|tx| {
            if sheet_exists(tx, sheet)? {
                tx.execute("DELETE FROM pva_cells WHERE sheet = ?", params![sheet])?;
            } else {
                create_sheet(tx, sheet)?;
            }
            put_rows(tx, sheet, 1, rows)
        })
    }

    fn cell(&self, sheet: &str, row: usize, col: usize) -> Result<String, PvaError> {
        check_cell(sheet, row, col)?;
        require_sheet(&self.conn, sheet)?;
        let mut stmt = self.conn.prepare(
            "SELECT value FROM pva_cells WHERE sheet = ? AND row_no = ? AND col_no = ?",
        )?;
        let mut rows = stmt.query(params![sheet, row as i64, col as i64])?;
        match rows.next()? {
            Some(found) => Ok(found.get(0)?),
            None => Ok(String::new()),
        }
    }

    fn set_cell(&mut self, sheet: &str, row: usize, col: usize, value: &str) -> Result<(), PvaError> {
        check_cell(sheet, row, col)?;
        self.write(|tx| {
            require_sheet(tx, sheet)?;
            put_cell(tx, sheet, row, col, value)
        })
    }

    fn insert_unique(&mut self, sheet: &str, key_col: usize, row: &[String]) -> Result<Option<usize>, PvaError> {
        check_cell(sheet, 1, key_col)?;
        let key = row.get(key_col - 1).cloned().unwrap_or_default();
        self.write(|tx| {
            require_sheet(tx, sheet)?;
            // Rows without a cell in the key column hold an empty key.
            let taken: bool = if key.is_empty() {
                tx.query_row(
                    "SELECT COUNT(*) > 0 FROM (SELECT DISTINCT row_no FROM pva_cells WHERE sheet = ? AND row_no > 1) AS used \
                     WHERE row_no NOT IN (SELECT row_no FROM pva_cells WHERE sheet = ? AND col_no = ?)",
                    params![sheet, sheet, key_col as i64],
                    |found| found.get(0),
                )?
            } else {
                tx.query_row(
                    "SELECT COUNT(*) > 0 FROM pva_cells WHERE sheet = ? AND col_no = ? AND row_no > 1 AND value = ?",
                    params![sheet, key_col as i64, key],
                    |found| found.get(0),
                )?
            };
            if taken {
                return Ok(None);
            }
            let new_row = last_row(tx, sheet)? + 1;
            put_rows(tx, sheet, new_row, &[row.to_vec()])?;
            Ok(Some(new_row))
        })
    }

    fn named_ranges(&self) -> Result<Vec<(String, CellRef)>, PvaError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, sheet, row_no, col_no FROM pva_named_ranges ORDER BY name",
        )?;
        let ranges = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    CellRef {
                        sheet: row.get(1)?,
                        row: row.get::<_, i64>(2)? as usize,
                        col: row.get::<_, i64>(3)? as usize,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ranges)
    }

    fn named_range(&self, name: &str) -> Result<Option<CellRef>, PvaError> {
        let mut stmt = self.conn.prepare(
            "SELECT sheet, row_no, col_no FROM pva_named_ranges WHERE name = ?",
        )?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(CellRef {
                sheet: row.get(0)?,
                row: row.get::<_, i64>(1)? as usize,
                col: row.get::<_, i64>(2)? as usize,
            })),
            None => Ok(None),
        }
    }

    fn set_named_range(&mut self, name: &str, cell: &CellRef) -> Result<(), PvaError> {
        check_cell(&cell.sheet, cell.row, cell.col)?;
        self.write(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO pva_named_ranges (name, sheet, row_no, col_no) VALUES (?, ?, ?, ?)",
                params![name, cell.sheet, cell.row as i64, cell.col as i64],
            )?;
            Ok(())
        })
    }
}
