use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptError {
    /// A secret could not be resolved from memory, the environment or the key file.
    #[error(
        "missing secret {name}: supply it with KeyStore::set, the {env} environment variable, or the key file"
    )]
    MissingKey { name: &'static str, env: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("encryption failed: {0}")]
    Encrypt(String),
    /// The decrypted license is not JSON: wrong key or corrupt blob.
    #[error("license is not valid JSON (wrong key or corrupt blob): {0}")]
    InvalidLicense(#[source] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptError {
    /// Whether this error means the process is missing secrets or cipher setup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingKey { .. } | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, CryptError>;
