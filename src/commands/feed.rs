use std::path::Path;

use anyhow::Result;
use product_video_ads::feed;
use product_video_ads::feed::MerchantCenterClient;

use crate::commands::open_store;
use crate::commands::require_token;

/// Execute the `feed-import` command.
pub fn execute(database: &Path, token: Option<&str>) -> Result<()> {
    let mut store = open_store(database)?;
    let source = MerchantCenterClient::new(require_token(token)?);
    let imported = feed::import_feed(&mut store, &source)?;
    println!("Imported {imported} products into Offers Feed.");
    Ok(())
}
