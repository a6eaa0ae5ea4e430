use crate::error::PvaError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::reference::parse_cell_address;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::CellRef;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use zip::read::ZipFile;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_DEFINED_NAME: QName = QName(b"definedName");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Prefix of the names Excel reserves for print areas, filters and the like.
const BUILTIN_NAME_PREFIX: &str = "_xlnm.";

/// Office Open XML workbook (`.xlsx`, `.xlsm`).
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    number_formats: Vec<CellType>,
    /// (sheet name, zip path) in workbook order
    sheets: Vec<(String, String)>,
    named_ranges: Vec<(String, CellRef)>,
    shared_strings: Option<Vec<String>>,
}

/// What `xl/workbook.xml` declares.
struct WorkbookPart {
    sheets: Vec<(String, String)>,
    named_ranges: Vec<(String, CellRef)>,
    is_1904: bool,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(name: &str, mut zip: ZipArchive<UnifiedReader>) -> Result<XlsxSpreadsheet, PvaError> {
        let workbook = load_workbook(&mut zip)?;
        if workbook.sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbookError(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, workbook.is_1904)?;
        Ok(XlsxSpreadsheet {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets: workbook.sheets,
            named_ranges: workbook.named_ranges,
            shared_strings: None,
        })
    }

    fn load_shared_strings(&mut self) -> Result<Vec<String>, PvaError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }

    fn shared_string(&mut self, sheet: &str, index: &str) -> Result<String, PvaError> {
        if self.shared_strings.is_none() {
            self.shared_strings = Some(self.load_shared_strings()?);
        }
        let position = index.parse::<usize>()?;
        self.shared_strings
            .as_ref()
            .and_then(|strings| strings.get(position))
            .cloned()
            .ok_or_else(|| {
                SpreadsheetError::MissingPartError(format!("shared string {position} of sheet '{sheet}'")).into()
            })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn named_ranges(&self) -> Vec<(String, CellRef)> {
        self.named_ranges.clone()
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, PvaError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in self.sheets.clone() {
            if !criteria.accept(&sheet_name) {
                continue;
            }

            // Shared strings are resolved once the worksheet reader is released.
            let mut raw = Vec::<(usize, usize, CellType, String, bool)>::new();
            {
                let mut row_count = 0usize;
                let mut col_count = 0usize;
                let mut row = 0usize;
                let mut col = 0usize;
                let mut kind = CellType::default();
                let mut is_shared = false;
                let mut value = String::new();
                let mut reader = self.zip.xml_reader(&zip_path)?
                    .ok_or_else(|| SpreadsheetError::MissingPartError(zip_path.to_owned()))?;
                match_xml_events!(reader => {
                    Event::End(event) if event.name() == TAG_ROW => {
                        row_count += 1;
                        col_count = 0;
                    }
                    Event::Start(event) if event.name() == TAG_ROW => {
                        if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                            row_count = number.saturating_sub(1);
                        }
                    }
                    Event::Start(event) if event.name() == TAG_CELL => {
                        (row, col) = event.get_attribute_value("r")?
                            .and_then(|reference| reference_to_index(&reference))
                            .unwrap_or((row_count, col_count));
                        col_count = col + 1;
                        value.clear();
                        is_shared = false;
                        kind = match event.get_attribute_value("t")?.as_deref() {
                            Some("inlineStr") | Some("str") => CellType::Text,
                            Some("s") => {
                                is_shared = true;
                                CellType::Text
                            }
                            Some("d") => CellType::IsoDateTime,
                            Some("b") => CellType::Boolean,
                            Some("e") => CellType::Error,
                            _ => CellType::Number,
                        };
                        if let Some(format_id) = event.get_attribute_value("s")? {
                            if kind == CellType::Number && !format_id.is_empty() {
                                let index = format_id.parse::<usize>()?;
                                kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                            }
                        }
                    }
                    Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                        value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                    }
                    Event::Start(event) if event.name() == TAG_VALUE => {
                        value = read_string_value(&mut reader, TAG_VALUE, true)?;
                    }
                    Event::End(event) if event.name() == TAG_CELL => {
                        if !value.is_empty() {
                            raw.push((row, col, kind, std::mem::take(&mut value), is_shared));
                        }
                    }
                });
            }

            let mut sheet = Sheet::new(&sheet_name);
            for (row, col, kind, value, is_shared) in raw {
                let value = if is_shared {
                    self.shared_string(&sheet_name, &value)?
                } else {
                    value
                };
                sheet.push(Cell { row, col, kind, value });
            }
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

/// Reads sheet order, defined names and the date system from `xl/workbook.xml`.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<WorkbookPart, PvaError> {
    let relationships = excel::load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPartError("xl/workbook.xml".to_owned()))?;
    let mut part = WorkbookPart {
        sheets: Vec::new(),
        named_ranges: Vec::new(),
        is_1904: false,
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    part.sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_DEFINED_NAME => {
            let name = event.get_attribute_value("name")?.map(|name| name.to_string());
            let address = read_string_value(&mut reader, TAG_DEFINED_NAME, true)?;
            if let Some(name) = name.filter(|name| !name.starts_with(BUILTIN_NAME_PREFIX)) {
                if let Some(cell) = parse_cell_address(&address, '!') {
                    part.named_ranges.push((name, cell));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            part.is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok(part)
}

/// Builds the style index → cell kind table from `xl/styles.xml`.
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, is_1904: bool) -> Result<Vec<CellType>, PvaError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(
                event.get_attribute_value("numFmtId")?
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "0".to_owned()),
            );
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Collects the text up to `end_tag`, skipping phonetic runs.
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, UnifiedReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, PvaError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
