use thiserror::Error;

/// Error type shared by every module of the crate.
/// Wraps standard library and dependency errors as well as the module specific enums.
#[derive(Error, Debug)]
pub enum PvaError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    DuckDBError(#[from] duckdb::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    UrlError(#[from] url::ParseError),

    #[error("{0}")]
    RegexError(#[from] regex::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    UnifiedReaderError(#[from] crate::helpers::reader::UnifiedReaderError),

    // Domain module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    StoreError(#[from] crate::store::StoreError),

    #[error("{0}")]
    SettingError(#[from] crate::base_config::SettingError),

    #[error("{0}")]
    ConfigError(#[from] crate::validator::ConfigError),

    #[error("{0}")]
    LedgerError(#[from] crate::ledger::LedgerError),

    #[error("{0}")]
    StorageError(#[from] crate::storage::StorageError),

    #[error("{0}")]
    FeedError(#[from] crate::feed::FeedError),

    #[error("{0}")]
    VideoError(#[from] crate::videos::VideoError),
}

pub trait ResultMessage {
    /// Prepends `message` to the error text, keeping the success value untouched.
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, PvaError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| PvaError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_prepended_to_errors_only() {
        let failed: Result<(), PvaError> = Err(PvaError::WithContextError("boom".to_owned()));
        assert_eq!(failed.with_prefix("Reading Timing").unwrap_err().to_string(), "Reading Timing: boom");

        let passed: Result<u8, PvaError> = Ok(7);
        assert_eq!(passed.with_prefix("Reading Timing").unwrap(), 7);
    }
}
