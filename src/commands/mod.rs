pub mod config;
pub mod export;
pub mod feed;
pub mod import;
pub mod setup;
pub mod status;
pub mod videos;

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use product_video_ads::base_config;
use product_video_ads::base_config::ConfigField;
use product_video_ads::base_config::ConfigGroup;
use product_video_ads::storage::GcsClient;
use product_video_ads::storage::LocalStorage;
use product_video_ads::storage::ObjectStorage;
use product_video_ads::store::DuckDbStore;
use product_video_ads::store::TableStore;

pub fn open_store(database: &Path) -> Result<DuckDbStore> {
    DuckDbStore::open(database).with_context(|| format!("Failed to open database: {}", database.display()))
}

pub fn require_token(token: Option<&str>) -> Result<&str> {
    token
        .filter(|token| !token.is_empty())
        .context("An access token is required: pass --access-token or set PVA_ACCESS_TOKEN")
}

/// Local directory when given, otherwise the bucket configured in Base Config.
pub fn object_storage(
    store: &dyn TableStore,
    local_dir: Option<&Path>,
    token: Option<&str>,
) -> Result<Box<dyn ObjectStorage>> {
    if let Some(dir) = local_dir {
        return Ok(Box::new(LocalStorage::new(dir)));
    }
    let bucket = base_config::config_value(store, ConfigGroup::GoogleCloud, ConfigField::StorageBucket)?;
    if bucket.is_empty() {
        anyhow::bail!("No storage bucket configured: run `pva config set googleCloud storageBucket <bucket>`");
    }
    Ok(Box::new(GcsClient::new(&bucket, require_token(token)?)))
}
