//! Per-session secrets from the gateway `mobile_auth` handshake.
//!
//! `mobile_auth` returns a hex blob. AES-128-ECB-decrypting it with
//! `MOBILE_GW_KEY` yields 112 ASCII bytes laid out as:
//!
//! | Offset     | Field      |
//! |------------|------------|
//! | `[0, 64)`  | token      |
//! | `[64, 80)` | token key  |
//! | `[80, 96)` | user key   |
//! | `[96, 112)`| stream key |

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{aes128_ecb_decrypt, aes128_ecb_encrypt, zero_pad};
use crate::error::{CryptError, Result};
use crate::keystore::{KeyName, KeyStore};

const TOKEN_LEN: usize = 64;
const PLAINTEXT_LEN: usize = 112;

/// Secrets derived from one handshake. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyBag {
    token: String,
    token_key: [u8; 16],
    user_key: [u8; 16],
    stream_key: [u8; 16],
}

impl KeyBag {
    /// Decrypt a `mobile_auth` blob with the store's `MOBILE_GW_KEY`.
    pub fn decrypt(keys: &KeyStore, encrypted_hex: &str) -> Result<Self> {
        let gw_key = keys.resolve_key16(KeyName::MobileGwKey)?;
        Self::decrypt_with_key(&gw_key, encrypted_hex)
    }

    pub fn decrypt_with_key(gw_key: &[u8; 16], encrypted_hex: &str) -> Result<Self> {
        let encrypted = hex::decode(encrypted_hex.trim())?;
        let mut plain = aes128_ecb_decrypt(gw_key, &encrypted)?;
        if plain.len() < PLAINTEXT_LEN {
            plain.zeroize();
            return Err(CryptError::Decrypt(format!(
                "handshake blob too short: {} bytes",
                encrypted.len()
            )));
        }
        if !plain[..PLAINTEXT_LEN].is_ascii() {
            plain.zeroize();
            return Err(CryptError::Decrypt(
                "handshake blob is not ASCII (wrong MOBILE_GW_KEY?)".into(),
            ));
        }

        let field = |start: usize| -> [u8; 16] {
            let mut out = [0u8; 16];
            out.copy_from_slice(&plain[start..start + 16]);
            out
        };
        let bag = Self {
            token: plain[..TOKEN_LEN].iter().map(|&b| char::from(b)).collect(),
            token_key: field(64),
            user_key: field(80),
            stream_key: field(96),
        };
        plain.zeroize();
        Ok(bag)
    }

    /// `token` encrypted with `token_key`, hex-encoded. Sent as `auth_token`
    /// to `api_checkToken`.
    pub fn gateway_token(&self) -> Result<String> {
        let encrypted = aes128_ecb_encrypt(&self.token_key, self.token.as_bytes())?;
        Ok(hex::encode(encrypted))
    }

    /// Zero-pad `plaintext` and encrypt it with `user_key`, hex-encoded.
    /// Used for credential fields such as the password.
    pub fn encrypt_param(&self, plaintext: &str) -> Result<String> {
        let mut padded = zero_pad(plaintext.as_bytes());
        let encrypted = aes128_ecb_encrypt(&self.user_key, &padded);
        padded.zeroize();
        Ok(hex::encode(encrypted?))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_key(&self) -> &[u8; 16] {
        &self.token_key
    }

    pub fn user_key(&self) -> &[u8; 16] {
        &self.user_key
    }

    pub fn stream_key(&self) -> &[u8; 16] {
        &self.stream_key
    }
}

impl fmt::Debug for KeyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyBag { .. }")
    }
}
