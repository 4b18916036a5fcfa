use serde_json::Value;

use crate::cipher::{aes128_ecb_decrypt, md5_hex, strip_zero_padding};
use crate::error::{CryptError, Result};

/// Decrypted per-user license document.
#[derive(Debug, Clone)]
pub struct License {
    document: Value,
}

impl License {
    /// Decrypt a hex license blob (`PREMIUM.RANDOM`) for the given account
    /// `description` and device `serial`.
    pub fn decrypt(encrypted_hex: &str, description: &str, serial: &str) -> Result<Self> {
        let key = derive_license_key(description, serial);
        let encrypted = hex::decode(encrypted_hex.trim())?;
        let decrypted = aes128_ecb_decrypt(&key, &encrypted)?;
        Self::from_decrypted(strip_zero_padding(&decrypted))
    }

    /// Parse the license from decrypted bytes with the zero padding removed.
    pub fn from_decrypted(data: &[u8]) -> Result<Self> {
        let document = serde_json::from_slice(data).map_err(CryptError::InvalidLicense)?;
        Ok(Self { document })
    }

    /// `LICENCE.OPTIONS.license_token`, required by the media endpoint.
    pub fn license_token(&self) -> Option<&str> {
        self.document["LICENCE"]["OPTIONS"]["license_token"].as_str()
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

/// The 16-byte AES key: the four 16-character halves of the hex MD5 digests
/// of `description` and `serial`, XORed together character by character.
pub fn derive_license_key(description: &str, serial: &str) -> [u8; 16] {
    let desc_hash = md5_hex(description.as_bytes());
    let serial_hash = md5_hex(serial.as_bytes());
    let (d, s) = (desc_hash.as_bytes(), serial_hash.as_bytes());

    let mut key = [0u8; 16];
    for (i, k) in key.iter_mut().enumerate() {
        *k = d[i] ^ d[i + 16] ^ s[i] ^ s[i + 16];
    }
    key
}
