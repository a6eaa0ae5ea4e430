use crate::error::PvaError;
use crate::storage::match_glob;
use crate::storage::ObjectStorage;
use crate::storage::StorageError;
use crate::storage::StoredObject;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;
use tracing::info;
use url::Url;

const BASE_URL: &str = "https://storage.googleapis.com";

/// Cloud Storage JSON API client for one bucket, authorised with an OAuth access token.
pub struct GcsClient {
    client: Client,
    base_url: String,
    bucket: String,
    token: String,
}

#[derive(Deserialize)]
struct UploadedObject {
    bucket: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<StoredObject>,
    next_page_token: Option<String>,
}

impl GcsClient {
    pub fn new(bucket: &str, token: &str) -> Self {
        Self::with_base_url(BASE_URL, bucket, token)
    }

    pub fn with_base_url(base_url: &str, bucket: &str, token: &str) -> Self {
        GcsClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            bucket: bucket.to_owned(),
            token: token.to_owned(),
        }
    }

    /// `<base>/<prefix>/b/<bucket>/o[/<object>]` with every segment percent-encoded.
    fn endpoint(&self, prefix: &[&str], object: Option<&str>) -> Result<Url, PvaError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidEndpoint(self.base_url.clone()))?
            .pop_if_empty()
            .extend(prefix)
            .extend(["b", self.bucket.as_str(), "o"])
            .extend(object);
        Ok(url)
    }
}

impl ObjectStorage for GcsClient {
    fn upload_file(&self, content: &[u8], path: &str, content_type: &str) -> Result<String, PvaError> {
        let url = self.endpoint(&["upload", "storage", "v1"], None)?;
        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", path)])
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content.to_vec())
            .send()?;
        if !response.status().is_success() {
            return Err(StorageError::UploadError {
                path: path.to_owned(),
                status: response.status().as_u16(),
            }
            .into());
        }
        let uploaded: UploadedObject = response.json()?;
        info!(bucket = %uploaded.bucket, name = %uploaded.name, "uploaded file");
        Ok(format!("https://storage.cloud.google.com/{}/{}", uploaded.bucket, uploaded.name))
    }

    fn get_file(&self, path: &str) -> Result<Vec<u8>, PvaError> {
        let url = self.endpoint(&["storage", "v1"], Some(path))?;
        let response = self
            .client
            .get(url)
            .query(&[("alt", "media")])
            .bearer_auth(&self.token)
            .send()?;
        if !response.status().is_success() {
            return Err(StorageError::DownloadError {
                path: path.to_owned(),
                status: response.status().as_u16(),
            }
            .into());
        }
        Ok(response.bytes()?.to_vec())
    }

    fn list_files(&self, prefix: &str) -> Result<Vec<StoredObject>, PvaError> {
        let url = self.endpoint(&["storage", "v1"], None)?;
        let glob = match_glob(prefix);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(url.clone())
                .query(&[("matchGlob", glob.as_str())])
                .bearer_auth(&self.token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request.send()?;
            if !response.status().is_success() {
                return Err(StorageError::ListError {
                    path: prefix.to_owned(),
                    status: response.status().as_u16(),
                }
                .into());
            }
            let page: ObjectList = response.json()?;
            objects.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        debug!(prefix, count = objects.len(), "listed files");
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_are_one_encoded_segment() {
        let client = GcsClient::new("pva-bucket", "token");
        let url = client
            .endpoint(&["storage", "v1"], Some("2024-05-01T10:00:00.000Z-k3j9/Hamburg City.mp4"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/pva-bucket/o/2024-05-01T10:00:00.000Z-k3j9%2FHamburg%20City.mp4"
        );
    }

    #[test]
    fn upload_endpoint_keeps_a_base_path() {
        let client = GcsClient::with_base_url("http://localhost:4443/gcs/", "pva-bucket", "token");
        let url = client.endpoint(&["upload", "storage", "v1"], None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4443/gcs/upload/storage/v1/b/pva-bucket/o");
    }

    #[test]
    fn listings_without_items_are_empty() {
        let page: ObjectList = serde_json::from_str(r#"{"kind":"storage#objects"}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());

        let page: ObjectList =
            serde_json::from_str(r#"{"items":[{"name":"f/Hamburg.mp4","size":"12"}],"nextPageToken":"p2"}"#).unwrap();
        assert_eq!(page.items[0].name, "f/Hamburg.mp4");
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));
    }
}
