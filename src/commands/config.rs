use std::path::Path;

use anyhow::Result;
use product_video_ads::base_config;
use product_video_ads::base_config::ConfigField;
use product_video_ads::base_config::ConfigGroup;

use crate::commands::open_store;

pub fn get(database: &Path, group: ConfigGroup, field: ConfigField) -> Result<()> {
    let store = open_store(database)?;
    println!("{}", base_config::config_value(&store, group, field)?);
    Ok(())
}

pub fn set(database: &Path, group: ConfigGroup, field: ConfigField, value: &str) -> Result<()> {
    let mut store = open_store(database)?;
    base_config::set_config_value(&mut store, group, field, value)?;
    println!("{} / {} = {}", group, field, value);
    Ok(())
}
