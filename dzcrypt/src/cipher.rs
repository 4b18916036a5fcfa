use aes::Aes128;
use blowfish::Blowfish;
use cbc::cipher::InnerIvInit;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, block_padding::NoPadding};
use md5::{Digest, Md5};

use crate::error::{CryptError, Result};

type Aes128EcbDec = ecb::Decryptor<Aes128>;
type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type BlowfishCbcDec = cbc::Decryptor<Blowfish>;

const AES_BLOCK: usize = 16;

/// AES-128-ECB decrypt without padding. `data` must be a whole number of blocks.
pub fn aes128_ecb_decrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % AES_BLOCK != 0 {
        return Err(CryptError::Decrypt(format!(
            "ciphertext length {} is not a multiple of {AES_BLOCK}",
            data.len()
        )));
    }
    let mut buf = data.to_vec();
    Aes128EcbDec::new(key.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map(<[u8]>::to_vec)
        .map_err(|e| CryptError::Decrypt(e.to_string()))
}

/// AES-128-ECB encrypt without padding. Callers pad with [`zero_pad`] first.
pub fn aes128_ecb_encrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % AES_BLOCK != 0 {
        return Err(CryptError::Encrypt(format!(
            "plaintext length {} is not a multiple of {AES_BLOCK}",
            data.len()
        )));
    }
    let mut buf = data.to_vec();
    let len = buf.len();
    Aes128EcbEnc::new(key.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .map(<[u8]>::to_vec)
        .map_err(|e| CryptError::Encrypt(e.to_string()))
}

/// Zero-pad `data` up to the next multiple of 16. Aligned input is returned as-is.
pub fn zero_pad(data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    let rem = buf.len() % AES_BLOCK;
    if rem > 0 {
        buf.resize(buf.len() + AES_BLOCK - rem, 0);
    }
    buf
}

/// Drop trailing zero bytes.
pub fn strip_zero_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

/// Lowercase hex MD5 digest.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Build a Blowfish key schedule from a raw key (4 to 56 bytes).
pub fn new_blowfish(key: &[u8]) -> Result<Blowfish> {
    Blowfish::new_from_slice(key)
        .map_err(|e| CryptError::Config(format!("blowfish key rejected: {e}")))
}

/// Blowfish-CBC decrypt `data` in place, starting from `iv`. No padding.
pub fn blowfish_cbc_decrypt(cipher: &Blowfish, iv: &[u8; 8], data: &mut [u8]) -> Result<()> {
    BlowfishCbcDec::inner_iv_slice_init(cipher.clone(), iv)
        .map_err(|e| CryptError::Config(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(data)
        .map(|_| ())
        .map_err(|e| CryptError::Decrypt(e.to_string()))
}
