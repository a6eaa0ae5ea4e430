//! # Spreadsheet Readers
//!
//! Loads `.xlsx`, `.xlsm` and `.ods` workbooks into grids of display strings,
//! together with the single-cell named ranges they define. The grids are what
//! a person would see in the sheet, so they can be imported into a
//! [`TableStore`](crate::store::TableStore) as-is.
pub mod criteria;
mod cell;
mod excel;
mod ods;
pub mod reference;
mod sheet;
mod xlsx;

use crate::error::PvaError;
use crate::helpers::reader::UnifiedReader;
pub use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
pub use crate::spreadsheet::reference::CellRef;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// Signature of a Compound File Binary container, used by legacy `.xls` files
/// and by password-protected Office Open XML files.
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect spreadsheet format of '{0}'")]
    UnsupportedFormatError(String),

    #[error("Spreadsheet '{0}' is password protected or in legacy binary format")]
    PasswordProtectedError(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    EmptyWorkbookError(String),

    #[error("Spreadsheet part '{0}' is missing")]
    MissingPartError(String),

    #[error("Invalid ODS MIME type")]
    MimeTypeError,

    #[error("Cannot display value '{value}' of cell {sheet}!{reference}")]
    CellValueError {
        sheet: String,
        reference: String,
        value: String,
    },
}

/// Format specific reader behind [`read_workbook`].
pub(crate) trait Spreadsheet {
    fn name(&self) -> String;

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PvaError>;

    /// Single-cell named ranges; only complete after [`Spreadsheet::read_sheets`].
    fn named_ranges(&self) -> Vec<(String, CellRef)>;
}

/// A workbook rendered to display strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    pub name: String,
    /// (sheet name, rows) in workbook order; row 0 is the sheet's first row.
    pub sheets: Vec<(String, Vec<Vec<String>>)>,
    pub named_ranges: Vec<(String, CellRef)>,
}

/// Reads a workbook from a local path or an http(s) URL.
pub fn read_workbook(file_name: &str, criteria: &Criteria) -> Result<Workbook, PvaError> {
    let reader = UnifiedReader::new(file_name)?;
    read_workbook_from(file_name, reader, criteria)
}

pub fn read_workbook_bytes(name: &str, bytes: Vec<u8>, criteria: &Criteria) -> Result<Workbook, PvaError> {
    read_workbook_from(name, UnifiedReader::from_bytes(bytes), criteria)
}

fn read_workbook_from(name: &str, reader: UnifiedReader, criteria: &Criteria) -> Result<Workbook, PvaError> {
    let mut spreadsheet = open_spreadsheet(name, reader)?;
    let sheets = spreadsheet.read_sheets(criteria)?;
    let mut workbook = Workbook {
        name: spreadsheet.name(),
        sheets: Vec::with_capacity(sheets.len()),
        named_ranges: spreadsheet.named_ranges(),
    };
    for sheet in sheets {
        let grid = sheet.to_grid(criteria.error_as_empty)?;
        debug!(sheet = %sheet.name, rows = grid.len(), "read sheet");
        workbook.sheets.push((sheet.name, grid));
    }
    Ok(workbook)
}

/// Picks the reader from the container contents rather than the file extension.
fn open_spreadsheet(name: &str, mut reader: UnifiedReader) -> Result<Box<dyn Spreadsheet>, PvaError> {
    let mut signature = [0u8; 8];
    let is_cfb = reader.read_exact(&mut signature).is_ok() && signature == CFB_SIGNATURE;
    if is_cfb {
        Err(SpreadsheetError::PasswordProtectedError(name.to_owned()))?
    }
    reader.seek(SeekFrom::Start(0))?;

    let zip = ZipArchive::new(reader)
        .map_err(|_| SpreadsheetError::UnsupportedFormatError(name.to_owned()))?;
    let has_entry = |zip: &ZipArchive<UnifiedReader>, entry: &str| {
        zip.file_names().any(|file_name| file_name.eq_ignore_ascii_case(entry))
    };
    if has_entry(&zip, "xl/workbook.xml") {
        Ok(Box::new(XlsxSpreadsheet::open(name, zip)?))
    } else if has_entry(&zip, "content.xml") {
        Ok(Box::new(OdsSpreadsheet::open(name, zip)?))
    } else {
        Err(SpreadsheetError::UnsupportedFormatError(name.to_owned()).into())
    }
}
