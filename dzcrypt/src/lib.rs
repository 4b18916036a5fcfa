mod cipher;
pub mod error;
pub mod keybag;
pub mod keystore;
pub mod legacy;
mod license;
pub mod stream;

pub use error::{CryptError, Result};
pub use keybag::KeyBag;
pub use keystore::{KeyName, KeyStore, MasterKeys};
pub use legacy::LegacyStream;
pub use license::{License, derive_license_key};
pub use stream::{DecryptingReader, StreamDecryptor, decrypt_stream};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Decrypt a downloaded protected stream for `song_id` from `input` into `output`.
///
/// Returns the number of bytes written.
pub fn decrypt_file(keys: &KeyStore, song_id: &str, input: &Path, output: &Path) -> Result<u64> {
    let decryptor = StreamDecryptor::new(keys, song_id)?;
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let written = decrypt_stream(decryptor, &mut reader, &mut writer)?;
    writer.flush()?;
    Ok(written)
}
