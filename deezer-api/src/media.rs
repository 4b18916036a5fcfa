//! Media endpoint and stream descriptors.
//!
//! ## `get_song_streams`: `POST {media}/v1/get_url`
//!
//! Request:
//! ```json
//! {
//!   "license_token": "...",
//!   "track_tokens": ["..."],
//!   "media": [{ "type": "FULL", "formats": [{ "cipher": "BF_CBC_STRIPE", "format": "MP3_128" }] }]
//! }
//! ```
//!
//! Response (one `data` entry per track token, in order):
//! ```json
//! {
//!   "data": [{
//!     "media": [{
//!       "media_type": "FULL",
//!       "cipher": { "type": "BF_CBC_STRIPE" },
//!       "format": "MP3_128",
//!       "sources": [{ "url": "https://...", "provider": "ak" }],
//!       "nbf": 1700000000,
//!       "exp": 1700003600
//!     }]
//!   }]
//! }
//! ```
//!
//! Unlike the gateway, the media service reports failures with HTTP status
//! codes and an `errors` array.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Read;

use chrono::{DateTime, Utc};
use dzcrypt::{DecryptingReader, KeyStore, LegacyStream, StreamDecryptor};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{DeezerError, Result};
use crate::types::{LegacyFormat, MediaCipher, MediaFormat, MediaType};

/// Song identity needed by the media endpoint (`SNG_ID`, `TRACK_TOKEN`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRef {
    pub id: String,
    pub track_token: String,
}

impl SongRef {
    /// Pick `SNG_ID` and `TRACK_TOKEN` out of a gateway song object.
    pub fn from_json(song: &Value) -> Result<Self> {
        Ok(Self {
            id: song_id(song)?,
            track_token: song["TRACK_TOKEN"]
                .as_str()
                .ok_or_else(|| DeezerError::InvalidInput("song has no TRACK_TOKEN".into()))?
                .to_owned(),
        })
    }
}

/// Song fields used by the legacy URL scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySong {
    pub id: String,
    /// `MD5_ORIGIN`, falling back to `PUID`.
    pub md5_origin: String,
    pub media_version: String,
}

impl LegacySong {
    pub fn from_json(song: &Value) -> Result<Self> {
        let md5_origin = song["MD5_ORIGIN"]
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| song["PUID"].as_str())
            .ok_or_else(|| DeezerError::InvalidInput("song has no MD5_ORIGIN or PUID".into()))?;
        Ok(Self {
            id: song_id(song)?,
            md5_origin: md5_origin.to_owned(),
            media_version: string_field(&song["MEDIA_VERSION"]).unwrap_or_default(),
        })
    }
}

/// Options for [`MediaClient::get_song_streams`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// `Preview` requires `cipher = None`.
    pub media_type: MediaType,
    pub cipher: MediaCipher,
    /// Keep only the first source URL of each track.
    pub first_url_only: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            media_type: MediaType::Full,
            cipher: MediaCipher::BfCbcStripe,
            first_url_only: true,
        }
    }
}

/// Where and how to fetch one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub url: String,
    pub format: String,
    /// Whether the bytes are Blowfish-striped.
    pub protected: bool,
    /// Full track rather than preview.
    pub full: bool,
    pub not_before: Option<DateTime<Utc>>,
    pub expiry: Option<DateTime<Utc>>,
    /// Source track id, also the key derivation input.
    pub song_id: String,
}

impl StreamDescriptor {
    /// Descriptor for the legacy URL scheme. Always protected.
    pub fn for_legacy_stream(keys: &KeyStore, song: &LegacySong, format: LegacyFormat) -> Result<Self> {
        let url = LegacyStream {
            origin_hash: &song.md5_origin,
            format_code: format.code(),
            song_id: &song.id,
            media_version: &song.media_version,
        }
        .url(keys)?;
        Ok(Self {
            url,
            format: format!("{format:?}"),
            protected: true,
            full: true,
            not_before: None,
            expiry: None,
            song_id: song.id.clone(),
        })
    }

    /// Decryptor for this asset.
    pub fn decryptor(&self, keys: &KeyStore) -> Result<StreamDecryptor> {
        if !self.protected {
            return Err(DeezerError::State(
                "cannot create a decryptor for an unprotected asset".into(),
            ));
        }
        Ok(StreamDecryptor::new(keys, &self.song_id)?)
    }

    /// GET the asset and return its plain bytes as a reader.
    ///
    /// For protected assets the decryptor is built before the request, so a
    /// missing key fails without touching the network.
    pub fn open(&self, http: &Client, keys: &KeyStore) -> Result<Box<dyn Read + Send>> {
        let decryptor = if self.protected {
            Some(self.decryptor(keys)?)
        } else {
            None
        };
        let resp = http.get(&self.url).send()?.error_for_status()?;
        log::debug!("streaming song {} (protected: {})", self.song_id, self.protected);
        Ok(match decryptor {
            Some(decryptor) => Box::new(DecryptingReader::new(resp, decryptor)),
            None => Box::new(resp),
        })
    }
}

#[derive(Deserialize)]
struct UrlResponse {
    #[serde(default)]
    data: Vec<UrlEntry>,
}

#[derive(Deserialize)]
struct UrlEntry {
    #[serde(default)]
    media: Vec<MediaEntry>,
}

#[derive(Deserialize)]
struct MediaEntry {
    media_type: String,
    cipher: CipherEntry,
    format: String,
    #[serde(default)]
    sources: Vec<SourceEntry>,
    nbf: Option<i64>,
    exp: Option<i64>,
}

#[derive(Deserialize)]
struct CipherEntry {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct SourceEntry {
    url: String,
}

/// Client for the media service, bound to one license token.
#[derive(Debug, Clone)]
pub struct MediaClient {
    http: Client,
    base_url: String,
    license_token: String,
}

impl MediaClient {
    pub fn new(http: Client, base_url: impl Into<String>, license_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            license_token: license_token.into(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Resolve stream descriptors for `songs`, keyed by song id.
    ///
    /// Songs without any source are left out of the map.
    pub fn get_song_streams(
        &self,
        songs: &[SongRef],
        formats: &[MediaFormat],
        options: &StreamOptions,
    ) -> Result<HashMap<String, Vec<StreamDescriptor>>> {
        if songs.is_empty() {
            return Err(DeezerError::InvalidInput("must have at least one song".into()));
        }
        if formats.is_empty() {
            return Err(DeezerError::InvalidInput("must have at least one format".into()));
        }
        if options.media_type == MediaType::Preview && options.cipher != MediaCipher::None {
            return Err(DeezerError::InvalidInput("previews must use cipher NONE".into()));
        }

        let body = json!({
            "license_token": self.license_token,
            "track_tokens": songs.iter().map(|s| s.track_token.as_str()).collect::<Vec<_>>(),
            "media": [{
                "type": options.media_type,
                "formats": formats
                    .iter()
                    .map(|f| json!({ "cipher": options.cipher, "format": f }))
                    .collect::<Vec<_>>(),
            }],
        });
        let resp: UrlResponse = serde_json::from_value(self.get_url(&body)?)?;

        let mut assets = HashMap::new();
        for (song, entry) in songs.iter().zip(resp.data) {
            let Some(media) = entry.media.into_iter().next() else {
                continue;
            };
            if media.sources.is_empty() {
                continue;
            }
            let take = if options.first_url_only { 1 } else { media.sources.len() };
            let descriptors = media
                .sources
                .iter()
                .take(take)
                .map(|src| StreamDescriptor {
                    url: src.url.clone(),
                    format: media.format.clone(),
                    protected: media.cipher.kind != "NONE",
                    full: media.media_type == "FULL",
                    not_before: media.nbf.and_then(|s| DateTime::from_timestamp(s, 0)),
                    expiry: media.exp.and_then(|s| DateTime::from_timestamp(s, 0)),
                    song_id: song.id.clone(),
                })
                .collect();
            assets.insert(song.id.clone(), descriptors);
        }
        Ok(assets)
    }

    /// Raw `POST /v1/get_url`. Returns the response body on 200.
    pub fn get_url(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/v1/get_url", self.base_url.trim_end_matches('/'));
        let resp = self.http.post(url).json(body).send()?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let errors: Value = resp.json().unwrap_or(Value::Null);
            let mut message = String::from("media request failed");
            if let Some(list) = errors["errors"].as_array() {
                message.push_str(" with errors:");
                for e in list {
                    let _ = write!(message, "\n\t{}: {}", e["code"], e["message"].as_str().unwrap_or(""));
                }
            }
            return Err(DeezerError::Media {
                status: status.as_u16(),
                message,
                errors,
            });
        }
        Ok(resp.json()?)
    }
}

fn song_id(song: &Value) -> Result<String> {
    string_field(&song["SNG_ID"]).ok_or_else(|| DeezerError::InvalidInput("song has no SNG_ID".into()))
}

/// Gateway ids arrive as strings or numbers.
fn string_field(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
