use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use product_video_ads::videos;
use product_video_ads::videos::YouTubeClient;

use crate::commands::object_storage;
use crate::commands::open_store;
use crate::commands::require_token;

/// Execute the `upload-videos` command.
pub fn execute(database: &Path, local_dir: Option<&Path>, token: Option<&str>) -> Result<()> {
    let mut store = open_store(database)?;
    let storage = object_storage(&store, local_dir, token)?;
    let publisher = YouTubeClient::new(require_token(token)?);
    let video_ids = videos::register_videos(&mut store, storage.as_ref(), &publisher, Utc::now())?;
    for (ad_group, video_id) in &video_ids {
        println!("{:24} {}", ad_group, video_id);
    }
    println!("Published {} videos.", video_ids.len());
    Ok(())
}
