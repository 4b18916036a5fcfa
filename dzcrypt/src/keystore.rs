//! Process-wide secret bundle.
//!
//! Four named secrets drive the content-protection scheme. A [`KeyStore`]
//! resolves each of them from, in order:
//!
//! 1. a value already set in memory ([`KeyStore::set`], first write wins)
//! 2. an environment variable, `DEEZER_<NAME>` by default
//! 3. an optional JSON key file, read once on first use
//!
//! The default key file lives at `~/.config/dzcrypt/keys.json`:
//!
//! ```json
//! { "TRACK_XOR_KEY": "...", "LEGACY_URL_KEY": "...", "MOBILE_GW_KEY": "...", "MOBILE_API_KEY": "..." }
//! ```
//!
//! Build the store once at startup and share it (usually behind an `Arc`).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use secrecy::{ExposeSecret, Secret, SecretString};
use serde::Deserialize;

use crate::error::{CryptError, Result};

const DEFAULT_ENV_PREFIX: &str = "DEEZER_";

/// Names of the secrets held by a [`KeyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// AES key for legacy stream URL paths.
    LegacyUrlKey,
    /// XOR mask for per-track Blowfish keys.
    TrackXorKey,
    /// AES key for the `mobile_auth` handshake blob.
    MobileGwKey,
    /// Gateway `api_key` query parameter.
    MobileApiKey,
}

impl KeyName {
    pub const ALL: [Self; 4] = [
        Self::LegacyUrlKey,
        Self::TrackXorKey,
        Self::MobileGwKey,
        Self::MobileApiKey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyUrlKey => "LEGACY_URL_KEY",
            Self::TrackXorKey => "TRACK_XOR_KEY",
            Self::MobileGwKey => "MOBILE_GW_KEY",
            Self::MobileApiKey => "MOBILE_API_KEY",
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial set of secrets, as found in the key file or passed to [`KeyStore::set`].
#[derive(Default, Deserialize)]
pub struct MasterKeys {
    #[serde(rename = "LEGACY_URL_KEY")]
    pub legacy_url_key: Option<String>,
    #[serde(rename = "TRACK_XOR_KEY")]
    pub track_xor_key: Option<String>,
    #[serde(rename = "MOBILE_GW_KEY")]
    pub mobile_gw_key: Option<String>,
    #[serde(rename = "MOBILE_API_KEY")]
    pub mobile_api_key: Option<String>,
}

impl MasterKeys {
    fn into_entries(self) -> impl Iterator<Item = (KeyName, String)> {
        [
            (KeyName::LegacyUrlKey, self.legacy_url_key),
            (KeyName::TrackXorKey, self.track_xor_key),
            (KeyName::MobileGwKey, self.mobile_gw_key),
            (KeyName::MobileApiKey, self.mobile_api_key),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

impl fmt::Debug for MasterKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKeys")
            .field("legacy_url_key", &self.legacy_url_key.is_some())
            .field("track_xor_key", &self.track_xor_key.is_some())
            .field("mobile_gw_key", &self.mobile_gw_key.is_some())
            .field("mobile_api_key", &self.mobile_api_key.is_some())
            .finish()
    }
}

/// Resolves the secrets used by every cipher in this crate.
pub struct KeyStore {
    values: HashMap<KeyName, SecretString>,
    env_prefix: Option<String>,
    key_file: Option<PathBuf>,
    file_values: OnceCell<HashMap<KeyName, SecretString>>,
}

impl KeyStore {
    /// Store with the default sources: `DEEZER_*` variables and
    /// `~/.config/dzcrypt/keys.json`.
    pub fn new() -> Self {
        let key_file = dirs::config_dir().map(|dir| dir.join("dzcrypt").join("keys.json"));
        Self::with_sources(Some(DEFAULT_ENV_PREFIX), key_file)
    }

    /// Store with explicit sources. `None` disables that source.
    pub fn with_sources(env_prefix: Option<&str>, key_file: Option<PathBuf>) -> Self {
        Self {
            values: HashMap::new(),
            env_prefix: env_prefix.map(str::to_owned),
            key_file,
            file_values: OnceCell::new(),
        }
    }

    /// In-memory store that never looks at the environment or a file.
    pub fn from_keys(keys: MasterKeys) -> Self {
        let mut store = Self::with_sources(None, None);
        store.set(keys);
        store
    }

    /// Merge `partial` into the in-memory values. Keys already present are
    /// never overwritten.
    ///
    /// Meant for construction time: once the store is shared behind an `Arc`
    /// it is read-only.
    pub fn set(&mut self, partial: MasterKeys) {
        for (name, value) in partial.into_entries() {
            if self.values.contains_key(&name) {
                log::debug!("{name} already set, ignoring new value");
                continue;
            }
            self.values.insert(name, Secret::new(value));
        }
    }

    /// Resolve a secret from memory, the environment, then the key file.
    pub fn resolve(&self, name: KeyName) -> Result<SecretString> {
        if let Some(value) = self.values.get(&name) {
            return Ok(Secret::new(value.expose_secret().clone()));
        }
        if let Some(var) = self.env_var(name) {
            if let Ok(value) = std::env::var(&var) {
                return Ok(Secret::new(value));
            }
        }
        if let Some(value) = self.file_values()?.get(&name) {
            return Ok(Secret::new(value.expose_secret().clone()));
        }
        Err(CryptError::MissingKey {
            name: name.as_str(),
            env: self.env_var(name).unwrap_or_else(|| "(disabled)".into()),
        })
    }

    /// Resolve a secret that is used as a raw 16-byte key.
    pub fn resolve_key16(&self, name: KeyName) -> Result<[u8; 16]> {
        let secret = self.resolve(name)?;
        <[u8; 16]>::try_from(secret.expose_secret().as_bytes()).map_err(|_| {
            CryptError::Config(format!(
                "{name} must be exactly 16 bytes, got {}",
                secret.expose_secret().len()
            ))
        })
    }

    fn env_var(&self, name: KeyName) -> Option<String> {
        self.env_prefix
            .as_ref()
            .map(|prefix| format!("{prefix}{}", name.as_str()))
    }

    fn file_values(&self) -> Result<&HashMap<KeyName, SecretString>> {
        self.file_values.get_or_try_init(|| match &self.key_file {
            Some(path) => load_key_file(path),
            None => Ok(HashMap::new()),
        })
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set: Vec<_> = self.values.keys().map(|k| k.as_str()).collect();
        set.sort_unstable();
        f.debug_struct("KeyStore")
            .field("set", &set)
            .field("env_prefix", &self.env_prefix)
            .field("key_file", &self.key_file)
            .finish_non_exhaustive()
    }
}

fn load_key_file(path: &Path) -> Result<HashMap<KeyName, SecretString>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    log::debug!("loading key file {}", path.display());
    let data = fs::read_to_string(path)?;
    let keys: MasterKeys = serde_json::from_str(&data)?;
    Ok(keys
        .into_entries()
        .map(|(name, value)| (name, Secret::new(value)))
        .collect())
}
