use std::path::Path;

use anyhow::Result;
use product_video_ads::setup;

use crate::commands::open_store;

pub fn init(database: &Path) -> Result<()> {
    let mut store = open_store(database)?;
    setup::initialise_sheets(&mut store)?;
    println!("Sheets initialised in {}", database.display());
    Ok(())
}

pub fn populate(database: &Path) -> Result<()> {
    let mut store = open_store(database)?;
    setup::populate_example(&mut store)?;
    println!("Example campaign written.");
    Ok(())
}

pub fn reset(database: &Path) -> Result<()> {
    let mut store = open_store(database)?;
    setup::delete_all_sheets(&mut store)?;
    println!("All sheets deleted.");
    Ok(())
}
