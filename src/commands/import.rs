use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use product_video_ads::spreadsheet;
use product_video_ads::spreadsheet::Criteria;
use product_video_ads::store;

use crate::commands::open_store;

/// Execute the `import` command: replace the stored sheets with a workbook's.
pub fn execute(database: &Path, workbook: &str, sheets: &[String]) -> Result<()> {
    let patterns: Vec<&str> = sheets.iter().map(String::as_str).collect();
    let criteria = Criteria::new(&patterns, true).context("Invalid sheet pattern")?;
    let workbook = spreadsheet::read_workbook(workbook, &criteria)
        .with_context(|| format!("Failed to read workbook: {workbook}"))?;

    let mut store = open_store(database)?;
    store::import_workbook(&mut store, &workbook)?;
    for (name, rows) in &workbook.sheets {
        println!("{:24} {} rows", name, rows.len());
    }
    println!("{} named ranges", workbook.named_ranges.len());
    Ok(())
}
