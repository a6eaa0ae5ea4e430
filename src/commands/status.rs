use std::path::Path;

use anyhow::Result;
use product_video_ads::ledger;

use crate::commands::open_store;

/// Execute the `status` command: one line per ledger row.
pub fn execute(database: &Path) -> Result<()> {
    let store = open_store(database)?;
    let existing = ledger::load_existing(&store)?;
    if existing.is_empty() {
        println!("No ad groups recorded yet.");
        return Ok(());
    }
    for record in existing.values() {
        let video = if record.output_video_id.is_empty() { "-" } else { record.output_video_id.as_str() };
        println!(
            "{:24} {:9} {:12} {:40} {}",
            record.ad_group,
            record.expected_status,
            video,
            record.gcs_folder,
            record.errors
        );
    }
    Ok(())
}
