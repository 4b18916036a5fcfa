//! Legacy stream URLs.
//!
//! The older delivery scheme hides the asset location in an encrypted path:
//!
//! ```text
//! params    = origin_hash ¤ format ¤ song_id ¤ media_version
//! plaintext = md5_hex(params) ¤ params ¤        (zero-padded to 16)
//! url       = https://e-cdns-proxy-{origin_hash[0]}.dzcdn.net/mobile/1/{hex(aes_ecb(plaintext))}
//! ```
//!
//! `¤` is written as its UTF-8 bytes `C2 A4`.

use crate::cipher::{aes128_ecb_encrypt, md5_hex, zero_pad};
use crate::error::{CryptError, Result};
use crate::keystore::{KeyName, KeyStore};

pub const SEPARATOR: &str = "\u{a4}";

/// Inputs identifying one legacy stream.
#[derive(Debug, Clone, Copy)]
pub struct LegacyStream<'a> {
    /// `MD5_ORIGIN` (or `PUID`) of the song.
    pub origin_hash: &'a str,
    /// Numeric legacy format code.
    pub format_code: u8,
    pub song_id: &'a str,
    pub media_version: &'a str,
}

impl LegacyStream<'_> {
    /// Build the URL with the store's `LEGACY_URL_KEY`.
    pub fn url(&self, keys: &KeyStore) -> Result<String> {
        let key = keys.resolve_key16(KeyName::LegacyUrlKey)?;
        self.url_with_key(&key)
    }

    pub fn url_with_key(&self, key: &[u8; 16]) -> Result<String> {
        let host = self
            .origin_hash
            .chars()
            .next()
            .ok_or_else(|| CryptError::InvalidInput("empty origin hash".into()))?;

        let format_code = self.format_code.to_string();
        let params = [
            self.origin_hash,
            format_code.as_str(),
            self.song_id,
            self.media_version,
        ]
        .join(SEPARATOR);
        let params_hash = md5_hex(params.as_bytes());
        let plaintext = zero_pad(format!("{params_hash}{SEPARATOR}{params}{SEPARATOR}").as_bytes());
        let path = hex::encode(aes128_ecb_encrypt(key, &plaintext)?);

        Ok(format!("https://e-cdns-proxy-{host}.dzcdn.net/mobile/1/{path}"))
    }
}
