//! # Video Registration
//!
//! Picks up videos the renderer wrote next to an exported config, publishes
//! them on YouTube and records their ids in the ledger.
use crate::base_config;
use crate::base_config::ConfigField;
use crate::base_config::ConfigGroup;
use crate::error::PvaError;
use crate::ledger;
use crate::ledger::ExistingAdGroups;
use crate::storage::file_name;
use crate::storage::ObjectStorage;
use crate::store::TableStore;
use chrono::DateTime;
use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::LOCATION;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to upload video {title} (HTTP status {status})")]
    UploadError { title: String, status: u16 },

    #[error("YouTube returned no upload location for video {0}")]
    MissingUploadLocation(String),

    #[error("No YouTube channel ID configured")]
    MissingChannel,
}

/// Description given to every published video.
pub const VIDEO_DESCRIPTION: &str = "Uploaded by PVA";

const BASE_URL: &str = "https://www.googleapis.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub channel_id: String,
}

pub trait VideoPublisher {
    /// Publishes an mp4 video and returns its id.
    fn publish(&self, video: Vec<u8>, metadata: &VideoMetadata) -> Result<String, PvaError>;
}

/// YouTube Data API v3 client using resumable uploads.
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct PublishedVideo {
    id: String,
}

impl YouTubeClient {
    pub fn new(token: &str) -> Self {
        YouTubeClient {
            client: Client::new(),
            base_url: BASE_URL.to_owned(),
            token: token.to_owned(),
        }
    }

    fn check(&self, title: &str, status: reqwest::StatusCode) -> Result<(), VideoError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(VideoError::UploadError {
                title: title.to_owned(),
                status: status.as_u16(),
            })
        }
    }
}

impl VideoPublisher for YouTubeClient {
    fn publish(&self, video: Vec<u8>, metadata: &VideoMetadata) -> Result<String, PvaError> {
        let session = self
            .client
            .post(format!("{}/upload/youtube/v3/videos", self.base_url))
            .query(&[("uploadType", "resumable"), ("part", "snippet,id")])
            .bearer_auth(&self.token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", video.len())
            .json(&json!({
                "snippet": {
                    "title": metadata.title,
                    "description": metadata.description,
                    "channelId": metadata.channel_id,
                }
            }))
            .send()?;
        self.check(&metadata.title, session.status())?;
        let location = session
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| VideoError::MissingUploadLocation(metadata.title.clone()))?
            .to_owned();

        let response = self
            .client
            .put(location)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "video/mp4")
            .body(video)
            .send()?;
        self.check(&metadata.title, response.status())?;
        let published: PublishedVideo = response.json()?;
        Ok(published.id)
    }
}

/// Enabled ad groups with a folder but no video yet, grouped by folder.
pub fn pending_video_uploads(existing: &ExistingAdGroups) -> BTreeMap<String, Vec<String>> {
    let mut pending = BTreeMap::<String, Vec<String>>::new();
    for (name, record) in existing {
        if record.output_video_id.is_empty() && !record.gcs_folder.is_empty() && record.is_enabled() {
            pending.entry(record.gcs_folder.clone()).or_default().push(name.clone());
        }
    }
    pending
}

/// Publishes every rendered video awaited by the ledger and returns the new ids by ad group.
///
/// Only `<ad group>.mp4` files inside the folder the ad group was exported to count.
pub fn register_videos(
    store: &mut dyn TableStore,
    storage: &dyn ObjectStorage,
    publisher: &dyn VideoPublisher,
    now: DateTime<Utc>,
) -> Result<BTreeMap<String, String>, PvaError> {
    let existing = ledger::load_existing(store)?;
    let pending = pending_video_uploads(&existing);
    let mut video_ids = BTreeMap::new();
    if pending.is_empty() {
        info!("no videos pending");
        return Ok(video_ids);
    }
    let channel_id = base_config::config_value(store, ConfigGroup::YouTube, ConfigField::ChannelId)?;
    if channel_id.is_empty() {
        return Err(VideoError::MissingChannel.into());
    }

    for (folder, ad_groups) in &pending {
        for object in storage.list_files(folder)? {
            let Some(ad_group) = file_name(&object.name).strip_suffix(".mp4") else {
                continue;
            };
            if !ad_groups.iter().any(|name| name == ad_group) {
                warn!(file = %object.name, "video does not belong to a pending ad group");
                continue;
            }
            let metadata = VideoMetadata {
                title: ad_group.to_owned(),
                description: VIDEO_DESCRIPTION.to_owned(),
                channel_id: channel_id.clone(),
            };
            let video_id = publisher.publish(storage.get_file(&object.name)?, &metadata)?;
            info!(ad_group, video_id = %video_id, "published video");
            video_ids.insert(ad_group.to_owned(), video_id);
        }
    }

    ledger::log_videos(store, &existing, &video_ids, now)?;
    Ok(video_ids)
}
