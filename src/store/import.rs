use crate::error::PvaError;
use crate::error::ResultMessage;
use crate::spreadsheet::Workbook;
use crate::store::TableStore;
use tracing::info;

/// Copies every sheet and named range of `workbook` into `store`.
///
/// Sheets of the same name are overwritten; other sheets in the store are kept.
pub fn import_workbook(store: &mut dyn TableStore, workbook: &Workbook) -> Result<(), PvaError> {
    for (sheet, rows) in &workbook.sheets {
        store
            .replace(sheet, rows)
            .with_prefix(&format!("Importing sheet {sheet}"))?;
    }
    for (name, cell) in &workbook.named_ranges {
        store.set_named_range(name, cell)?;
    }
    info!(
        workbook = %workbook.name,
        sheets = workbook.sheets.len(),
        named_ranges = workbook.named_ranges.len(),
        "imported workbook"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures;
    use crate::spreadsheet::read_workbook_bytes;
    use crate::spreadsheet::Criteria;
    use crate::store::DuckDbStore;
    use crate::store::MemoryStore;

    fn workbook() -> Workbook {
        let bytes = fixtures::xlsx(
            &[
                ("Base Config", &[&["Configuration"], &[], &["Google Cloud"], &["", "Storage Bucket", "pva-bucket"]]),
                ("Offers", &[&["Offer ID", "Title", "Price"], &["1001", "Apples", "€1.09"]]),
            ],
            &[("googleCloud_storageBucket", "'Base Config'!$C$4")],
        );
        read_workbook_bytes("campaign.xlsx", bytes, &Criteria::default()).unwrap()
    }

    fn check(store: &mut dyn TableStore) {
        store.ensure("Timing", &["Template Video".to_owned()]).unwrap();
        store.ensure("Offers", &["Offer ID".to_owned()]).unwrap();
        import_workbook(store, &workbook()).unwrap();

        let offers = store.read("Offers").unwrap();
        assert_eq!(offers.header(), &["Offer ID", "Title", "Price"]);
        assert_eq!(offers.cell(2, 3), "€1.09");
        assert!(store.exists("Timing").unwrap());

        let cell = store.named_range("googleCloud_storageBucket").unwrap().unwrap();
        assert_eq!(store.cell(&cell.sheet, cell.row, cell.col).unwrap(), "pva-bucket");
    }

    #[test]
    fn imports_into_memory_store() {
        check(&mut MemoryStore::new());
    }

    #[test]
    fn imports_into_duckdb_store() {
        check(&mut DuckDbStore::in_memory().unwrap());
    }
}
