use crate::error::PvaError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UnifiedReaderError {
    #[error("No data from remote file '{0}'")]
    RemoteFileNoData(String),

    #[error("Fetching '{url}' failed with HTTP status {status}")]
    RemoteFileStatus { url: String, status: u16 },
}

/// Seekable source for a workbook: a local file or bytes held in memory.
pub(crate) enum UnifiedReader {
    Local(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local path, or downloads the file first when given an http(s) URL.
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, PvaError> {
        if Self::is_remote_url(file_name) {
            Self::download(file_name)
        } else {
            let file = File::open(file_name)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        Url::parse(file_name)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    fn download(file_name: &str) -> Result<UnifiedReader, PvaError> {
        let response = reqwest::blocking::get(file_name)?;
        if !response.status().is_success() {
            Err(UnifiedReaderError::RemoteFileStatus {
                url: file_name.to_owned(),
                status: response.status().as_u16(),
            })?;
        }
        let bytes = response.bytes()?.to_vec();
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoData(file_name.to_owned()))?;
        }
        Ok(Self::from_bytes(bytes))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote_url() {
        assert!(!UnifiedReader::is_remote_url("campaign.xlsx"));
        assert!(!UnifiedReader::is_remote_url("/path/to/campaign.xlsx"));
        assert!(!UnifiedReader::is_remote_url("./relative/campaign.ods"));
        assert!(!UnifiedReader::is_remote_url("file:///path/to/campaign.xlsx"));

        assert!(UnifiedReader::is_remote_url("http://example.com/campaign.xlsx"));
        assert!(UnifiedReader::is_remote_url("https://example.com/campaign.xlsx"));
    }

    #[test]
    fn test_open_local_file() {
        let result = UnifiedReader::new("Cargo.toml");
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::new("non_existent_file.xlsx");
        assert!(result.is_err());
    }

    #[test]
    fn test_memory_reader_reads_back_bytes() {
        let mut reader = UnifiedReader::from_bytes(b"PK".to_vec());
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).unwrap();
        assert_eq!(buffer, b"PK");
    }
}
