//! # Object Storage
//!
//! Where compiled configs are handed to the renderer and where rendered
//! videos are picked up again. Every call is a single attempt.
mod gcs;
mod local;

pub use crate::storage::gcs::GcsClient;
pub use crate::storage::local::LocalStorage;

use crate::error::PvaError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Error uploading file to {path} (HTTP status {status})")]
    UploadError { path: String, status: u16 },

    #[error("Error reading file {path} (HTTP status {status})")]
    DownloadError { path: String, status: u16 },

    #[error("Error listing directory {path} (HTTP status {status})")]
    ListError { path: String, status: u16 },

    #[error("File {0} not found")]
    NotFound(String),

    #[error("Invalid storage endpoint {0}")]
    InvalidEndpoint(String),
}

/// Entry of a directory listing.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Full path of the object inside the bucket.
    pub name: String,
}

pub trait ObjectStorage {
    /// Stores `content` at `path` and returns the URL it can be viewed at.
    fn upload_file(&self, content: &[u8], path: &str, content_type: &str) -> Result<String, PvaError>;

    fn get_file(&self, path: &str) -> Result<Vec<u8>, PvaError>;

    fn get_file_text(&self, path: &str) -> Result<String, PvaError> {
        Ok(String::from_utf8(self.get_file(path)?)?)
    }

    /// Objects below `prefix`; an empty prefix lists everything.
    fn list_files(&self, prefix: &str) -> Result<Vec<StoredObject>, PvaError>;
}

/// Glob selecting everything below `prefix`.
pub(crate) fn match_glob(prefix: &str) -> String {
    if prefix.is_empty() {
        "**".to_owned()
    } else {
        format!("{prefix}/**")
    }
}

/// Last segment of an object path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globs_cover_the_whole_folder() {
        assert_eq!(match_glob(""), "**");
        assert_eq!(match_glob("2024-05-01T10:00:00.000Z-k3j9"), "2024-05-01T10:00:00.000Z-k3j9/**");
    }

    #[test]
    fn file_name_is_the_last_segment() {
        assert_eq!(file_name("folder/Hamburg.mp4"), "Hamburg.mp4");
        assert_eq!(file_name("Hamburg.mp4"), "Hamburg.mp4");
        assert_eq!(file_name("folder/"), "");
    }
}
