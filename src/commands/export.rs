use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use product_video_ads::pipeline;
use product_video_ads::validator;

use crate::commands::object_storage;
use crate::commands::open_store;

/// Execute the `validate` command: load every config table and report what is wrong.
pub fn validate(database: &Path) -> Result<()> {
    let store = open_store(database)?;
    let tables = validator::load_config_tables(&store, &[])?;
    for (sheet, records) in &tables {
        println!("{:20} {} rows", format!("{}:", sheet), records.len());
    }
    println!("\nAll tables valid.");
    Ok(())
}

/// Execute the `export` command.
pub fn execute(database: &Path, local_dir: Option<&Path>, token: Option<&str>) -> Result<()> {
    let mut store = open_store(database)?;
    let storage = object_storage(&store, local_dir, token)?;
    let export = pipeline::export_config(&mut store, storage.as_ref(), Utc::now())?;

    let compilation = &export.compilation;
    for (ad_group, error) in &compilation.errors {
        println!("{:24} FAILED    {}", ad_group, error);
    }
    for ad_group in compilation.changed.keys() {
        println!("{:24} CHANGED", ad_group);
    }
    for ad_group in &compilation.unchanged {
        println!("{:24} UNCHANGED", ad_group);
    }
    match export.uploaded {
        Some(url) => println!("\nUploaded {} configs to {}", compilation.batch.len(), url),
        None => println!("\nNothing changed, no upload."),
    }
    Ok(())
}
