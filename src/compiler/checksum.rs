use crate::compiler::AdGroupConfig;
use crate::error::PvaError;
use sha2::Digest;
use sha2::Sha256;

/// Lowercase hex SHA-256 of the compact JSON form of `config`.
pub fn checksum(config: &AdGroupConfig) -> Result<String, PvaError> {
    let json = serde_json::to_string(config)?;
    let digest = Sha256::digest(json.as_bytes());
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}
