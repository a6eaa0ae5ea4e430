//! Cell validation and the all-or-nothing loader for the config tables.
use crate::error::PvaError;
use crate::restriction::ValueRestrictions;
use crate::schema;
use crate::schema::ColumnName;
use crate::schema::SheetName;
use crate::store::Record;
use crate::store::TableStore;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Encountered {} cells with the wrong content:\n{}", errors.len(), errors.join("\n"))]
    InvalidConfig { errors: Vec<String> },
}

/// Records of each loaded sheet, in sheet row order.
pub type ConfigTables = BTreeMap<SheetName, Vec<Record>>;

/// Header rows of the sheets that permit bespoke columns.
pub type BespokeHeaders = BTreeMap<SheetName, Vec<String>>;

/// Returns one message per cell of `record` that violates its column's restriction.
///
/// Skipped: columns outside the sheet's fixed layout (bespoke or unknown
/// headers) and columns made optional by another value of the same row.
pub fn validate(
    record: &Record,
    sheet: SheetName,
    headers: &BespokeHeaders,
    restrictions: &ValueRestrictions,
) -> Vec<String> {
    let omittable = schema::omittable_columns(sheet, |column| record.get(column.label()));
    record
        .iter()
        .filter_map(|(name, value)| {
            let column = ColumnName::from_label(name)?;
            if !sheet.columns().contains(&column) || omittable.contains(&column) {
                return None;
            }
            let restriction = restrictions.get(column)?;
            (!restriction.is_valid(value, headers))
                .then(|| format!("[{sheet}] Found invalid value \"{value}\" as {column}."))
        })
        .collect()
}

/// Column names of `sheet`: its fixed layout, then the bespoke headers beyond it.
fn column_names(sheet: SheetName, headers: &BespokeHeaders) -> Vec<String> {
    let mut names = sheet.header();
    if let Some(header) = headers.get(&sheet) {
        names.extend(header.iter().skip(names.len()).cloned());
    }
    names
}

fn read_bespoke_headers(store: &dyn TableStore) -> Result<BespokeHeaders, PvaError> {
    let mut headers = BespokeHeaders::new();
    for sheet in SheetName::TABULAR.into_iter().filter(|sheet| sheet.has_bespoke_headers()) {
        let table = store.read(sheet.label())?;
        let mut header = table.header().to_vec();
        while header.last().map(String::is_empty).unwrap_or(false) {
            header.pop();
        }
        headers.insert(sheet, header);
    }
    Ok(headers)
}

/// Reads and validates `sheets` (all tabular sheets when empty).
///
/// Rows map to records by position. Entirely blank rows are ignored. Any
/// invalid cell fails the whole load with [`ConfigError::InvalidConfig`].
pub fn load_config_tables(store: &dyn TableStore, sheets: &[SheetName]) -> Result<ConfigTables, PvaError> {
    let sheets: &[SheetName] = if sheets.is_empty() { &SheetName::TABULAR } else { sheets };
    let restrictions = ValueRestrictions::new()?;
    let headers = read_bespoke_headers(store)?;

    let mut tables = ConfigTables::new();
    let mut errors = Vec::<String>::new();
    for sheet in sheets {
        let table = store.read(sheet.label())?;
        let columns = column_names(*sheet, &headers);
        let records = table.records(&columns);
        for record in &records {
            errors.extend(validate(record, *sheet, &headers, &restrictions));
        }
        debug!(sheet = %sheet, records = records.len(), "loaded config table");
        tables.insert(*sheet, records);
    }

    if errors.is_empty() {
        Ok(tables)
    } else {
        for error in &errors {
            warn!("{error}");
        }
        Err(ConfigError::InvalidConfig { errors }.into())
    }
}
