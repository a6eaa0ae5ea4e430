use crate::error::PvaError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::parse_cell_address;
use crate::spreadsheet::reference::CellRef;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use zip::ZipArchive;

const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const NAMED_RANGE: QName = QName(b"table:named-range");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
const SPACE: QName = QName(b"text:s");

/// OpenDocument spreadsheet (`.ods`).
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    named_ranges: Option<Vec<(String, CellRef)>>,
}

impl OdsSpreadsheet {
    pub(crate) fn open(name: &str, mut zip: ZipArchive<UnifiedReader>) -> Result<Self, PvaError> {
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::PasswordProtectedError(name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: name.to_owned(),
            zip,
            named_ranges: None,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn named_ranges(&self) -> Vec<(String, CellRef)> {
        self.named_ranges.clone().unwrap_or_default()
    }

    /// Walks `content.xml` once, collecting accepted tables and the named ranges that follow them.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PvaError> {
        let mut sheets = Vec::<Sheet>::new();
        let mut named_ranges = Vec::<(String, CellRef)>::new();
        let mut sheet = None::<Sheet>;

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut fallback = String::new();
        let mut element_context = false;
        let mut comment_context = false;

        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::MissingPartError("content.xml".to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                let table_name = event.get_attribute_value("table:name")?
                    .ok_or_else(|| SpreadsheetError::MissingPartError("table:name".to_owned()))?;
                sheet = criteria.accept(&table_name).then(|| Sheet::new(&table_name));
                row = 0;
            }
            Event::End(event) if event.name() == TABLE => {
                if let Some(finished) = sheet.take() {
                    sheets.push(finished);
                }
            }
            Event::Start(event) if event.name() == NAMED_RANGE => {
                let name = event.get_attribute_value("table:name")?;
                let address = event.get_attribute_value("table:cell-range-address")?;
                if let Some((name, address)) = name.zip(address) {
                    if let Some(cell) = parse_cell_address(&address, '.') {
                        named_ranges.push((name.to_string(), cell));
                    }
                }
            }
            Event::Start(event) if sheet.is_some() && event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if sheet.is_some() && event.name() == TABLE_ROW => {
                row += row_count;
            }
            Event::Start(event) if sheet.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                value.clear();
                fallback.clear();
                col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let value_type = event.get_attribute_value("office:value-type")?.map(|cow| cow.to_string());
                kind = match value_type.as_deref() {
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") => {
                        let is_error = event.get_attribute_value("calcext:value-type")?
                            .map(|cow| cow == "error")
                            .unwrap_or(false);
                        if is_error { CellType::Error } else { CellType::Text }
                    }
                    // float, currency and percentage cells show their formatted paragraph text
                    Some(_) => CellType::Text,
                    None => CellType::Empty,
                };
                match value_type.as_deref() {
                    Some("boolean") => value.push_str(&event.get_attribute_value("office:boolean-value")?.unwrap_or_default()),
                    Some("date") => value.push_str(&event.get_attribute_value("office:date-value")?.unwrap_or_default()),
                    Some("time") => value.push_str(&event.get_attribute_value("office:time-value")?.unwrap_or_default()),
                    Some("string") | None => element_context = kind != CellType::Empty,
                    Some(_) => {
                        fallback.push_str(&event.get_attribute_value("office:value")?.unwrap_or_default());
                        element_context = true;
                    }
                }
            }
            Event::End(event) if sheet.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                if value.is_empty() {
                    std::mem::swap(&mut value, &mut fallback);
                }
                if let Some(current) = sheet.as_mut() {
                    if kind != CellType::Empty && !value.is_empty() {
                        for row_offset in 0..row_count {
                            for col_offset in 0..col_count {
                                current.push(Cell {
                                    row: row + row_offset,
                                    col: col + col_offset,
                                    kind,
                                    value: value.to_owned(),
                                });
                            }
                        }
                    }
                }
                col += col_count;
                element_context = false;
                comment_context = false;
            }
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == SPACE => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    value.push(' ');
                }
            }
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });

        self.named_ranges = Some(named_ranges);
        Ok(sheets)
    }
}

fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), PvaError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.as_slice() != MIME_TYPE {
            Err(SpreadsheetError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// An encrypted ODS declares `manifest:encryption-data` for its entries.
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, PvaError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:encryption-data") => return Ok(true),
    });
    Ok(false)
}

#[cfg(test)]
mod tests {
    use crate::spreadsheet::fixtures;
    use crate::spreadsheet::read_workbook_bytes;
    use crate::spreadsheet::Criteria;

    const CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
<office:body><office:spreadsheet>
<table:table table:name="Timing">
<table:table-row>
<table:table-cell office:value-type="string"><text:p>Output AdGroup</text:p></table:table-cell>
<table:table-cell office:value-type="string"><text:p>Offset<text:s/>[s]</text:p></table:table-cell>
</table:table-row>
<table:table-row table:number-rows-repeated="2">
<table:table-cell office:value-type="string"><text:p>Hamburg &amp; Co</text:p><office:annotation><text:p>note</text:p></office:annotation></table:table-cell>
<table:table-cell office:value-type="float" office:value="11"><text:p>11</text:p></table:table-cell>
</table:table-row>
<table:table-row table:number-rows-repeated="1048570"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>
</table:table>
<table:table table:name="Base Config">
<table:table-row><table:table-cell table:number-columns-repeated="2"/><table:table-cell office:value-type="string"><text:p>bucket</text:p></table:table-cell></table:table-row>
</table:table>
<table:named-expressions>
<table:named-range table:name="googleCloud_storageBucket" table:base-cell-address="$'Base Config'.$C$1" table:cell-range-address="$'Base Config'.$C$1"/>
</table:named-expressions>
</office:spreadsheet></office:body>
</office:document-content>"#;

    #[test]
    fn reads_tables_and_repeated_rows() {
        let bytes = fixtures::ods(CONTENT);
        let workbook = read_workbook_bytes("book.ods", bytes, &Criteria::default()).unwrap();
        assert_eq!(workbook.sheets.len(), 2);
        let (name, grid) = &workbook.sheets[0];
        assert_eq!(name, "Timing");
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec!["Output AdGroup", "Offset [s]"]);
        assert_eq!(grid[1], vec!["Hamburg & Co", "11"]);
        assert_eq!(grid[2], vec!["Hamburg & Co", "11"]);
        assert_eq!(workbook.sheets[1].1, vec![vec!["", "", "bucket"]]);
    }

    #[test]
    fn reads_named_ranges() {
        let bytes = fixtures::ods(CONTENT);
        let workbook = read_workbook_bytes("book.ods", bytes, &Criteria::default()).unwrap();
        assert_eq!(workbook.named_ranges.len(), 1);
        let (name, cell) = &workbook.named_ranges[0];
        assert_eq!(name, "googleCloud_storageBucket");
        assert_eq!((cell.sheet.as_str(), cell.row, cell.col), ("Base Config", 1, 3));
    }

    #[test]
    fn unaccepted_tables_are_skipped() {
        let bytes = fixtures::ods(CONTENT);
        let criteria = Criteria::new(&["Base*"], false).unwrap();
        let workbook = read_workbook_bytes("book.ods", bytes, &criteria).unwrap();
        assert_eq!(workbook.sheets.len(), 1);
        assert_eq!(workbook.sheets[0].0, "Base Config");
    }

    const FORMATTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
<office:body><office:spreadsheet>
<table:table table:name="Offers">
<table:table-row>
<table:table-cell office:value-type="currency" office:currency="EUR" office:value="1.09"><text:p>€1.09</text:p></table:table-cell>
<table:table-cell office:value-type="percentage" office:value="0.25"><text:p>25%</text:p></table:table-cell>
<table:table-cell office:value-type="float" office:value="1.0900000000000001"><text:p>1.09</text:p></table:table-cell>
<table:table-cell office:value-type="float" office:value="42"/>
</table:table-row>
</table:table>
</office:spreadsheet></office:body>
</office:document-content>"#;

    #[test]
    fn formatted_numbers_keep_their_display_text() {
        let bytes = fixtures::ods(FORMATTED);
        let workbook = read_workbook_bytes("prices.ods", bytes, &Criteria::default()).unwrap();
        assert_eq!(workbook.sheets[0].1, vec![vec!["€1.09", "25%", "1.09", "42"]]);
    }
}
