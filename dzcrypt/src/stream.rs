//! Striped Blowfish decryption of protected media streams.
//!
//! A protected stream is cut into 2048-byte blocks in arrival order. Every
//! third block (index `0 mod 3`) is Blowfish-CBC encrypted with a per-track
//! key and the fixed IV `00 01 .. 07`, each block on its own; the rest are
//! plain. A trailing partial block is never encrypted.

use std::fmt;
use std::io::{self, Read, Write};

use blowfish::Blowfish;

use crate::cipher::{blowfish_cbc_decrypt, md5_hex, new_blowfish};
use crate::error::{CryptError, Result};
use crate::keystore::{KeyName, KeyStore};

pub const BLOCK_SIZE: usize = 2048;

const IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
const READ_CHUNK: usize = 0x8000;

/// Per-track Blowfish key.
///
/// XORs the *characters* of the hex MD5 of `song_id` (first half against
/// second half) with the characters of `TRACK_XOR_KEY`. The hex digits are
/// not decoded; the remote protocol depends on this.
pub fn track_key(xor_key: &[u8; 16], song_id: &str) -> [u8; 16] {
    let hash = md5_hex(song_id.as_bytes());
    let hash = hash.as_bytes();
    let mut key = [0u8; 16];
    for (i, k) in key.iter_mut().enumerate() {
        *k = hash[i] ^ hash[i + 16] ^ xor_key[i];
    }
    key
}

/// Decrypt one full block in place.
pub fn decrypt_block(cipher: &Blowfish, block: &mut [u8]) -> Result<()> {
    if block.len() != BLOCK_SIZE {
        return Err(CryptError::Decrypt(format!(
            "block must be {BLOCK_SIZE} bytes, got {}",
            block.len()
        )));
    }
    blowfish_cbc_decrypt(cipher, &IV, block)
}

/// Chunk-reassembling decryptor for one asset.
///
/// Feed input with [`update`](Self::update) in any chunk sizes; complete
/// blocks are appended to the output in order. Call [`finish`](Self::finish)
/// at end of input to get the unprocessed tail.
pub struct StreamDecryptor {
    cipher: Blowfish,
    carry: Vec<u8>,
    block_index: u64,
}

impl StreamDecryptor {
    /// Decryptor for `song_id` using the store's `TRACK_XOR_KEY`.
    ///
    /// Fails before any input is consumed if the key cannot be resolved.
    pub fn new(keys: &KeyStore, song_id: &str) -> Result<Self> {
        let xor_key = keys.resolve_key16(KeyName::TrackXorKey)?;
        Self::with_track_key(&track_key(&xor_key, song_id))
    }

    pub fn with_track_key(track_key: &[u8; 16]) -> Result<Self> {
        Ok(Self {
            cipher: new_blowfish(track_key)?,
            carry: Vec::with_capacity(BLOCK_SIZE),
            block_index: 0,
        })
    }

    /// Consume `chunk`, appending every block it completes to `out`.
    pub fn update(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut input = chunk;

        if !self.carry.is_empty() {
            let need = BLOCK_SIZE - self.carry.len();
            if input.len() < need {
                self.carry.extend_from_slice(input);
                return Ok(());
            }
            self.carry.extend_from_slice(&input[..need]);
            input = &input[need..];

            let start = out.len();
            out.extend_from_slice(&self.carry);
            self.carry.clear();
            self.process_block(&mut out[start..])?;
        }

        let mut blocks = input.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            let start = out.len();
            out.extend_from_slice(block);
            self.process_block(&mut out[start..])?;
        }
        self.carry.extend_from_slice(blocks.remainder());
        Ok(())
    }

    /// End of input: return the tail (always shorter than a block) unchanged.
    pub fn finish(mut self) -> Vec<u8> {
        log::trace!(
            "stream finished after {} blocks, {} trailing bytes",
            self.block_index,
            self.carry.len()
        );
        std::mem::take(&mut self.carry)
    }

    /// Number of complete blocks emitted so far.
    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    /// Bytes held back waiting for the rest of a block.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    fn process_block(&mut self, block: &mut [u8]) -> Result<()> {
        if self.block_index % 3 == 0 {
            decrypt_block(&self.cipher, block)?;
        }
        self.block_index += 1;
        Ok(())
    }
}

impl fmt::Debug for StreamDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDecryptor")
            .field("block_index", &self.block_index)
            .field("pending", &self.carry.len())
            .finish_non_exhaustive()
    }
}

/// [`Read`] adapter that decrypts `inner` on the fly.
///
/// Input is pulled one bounded chunk at a time, only once everything
/// decrypted so far has been handed to the caller.
pub struct DecryptingReader<R> {
    inner: R,
    decryptor: Option<StreamDecryptor>,
    input: Box<[u8]>,
    output: Vec<u8>,
    pos: usize,
}

impl<R: Read> DecryptingReader<R> {
    pub fn new(inner: R, decryptor: StreamDecryptor) -> Self {
        Self {
            inner,
            decryptor: Some(decryptor),
            input: vec![0u8; READ_CHUNK].into_boxed_slice(),
            output: Vec::with_capacity(READ_CHUNK + BLOCK_SIZE),
            pos: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.output.len() {
                let n = buf.len().min(self.output.len() - self.pos);
                buf[..n].copy_from_slice(&self.output[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.decryptor.is_none() {
                return Ok(0);
            }

            self.output.clear();
            self.pos = 0;
            let n = self.inner.read(&mut self.input)?;
            if n == 0 {
                if let Some(decryptor) = self.decryptor.take() {
                    self.output = decryptor.finish();
                }
                continue;
            }
            if let Some(decryptor) = self.decryptor.as_mut() {
                decryptor
                    .update(&self.input[..n], &mut self.output)
                    .map_err(io::Error::other)?;
            }
        }
    }
}

/// Decrypt everything from `r` into `w`. Returns the number of bytes written.
pub fn decrypt_stream<R: Read, W: Write>(
    decryptor: StreamDecryptor,
    r: &mut R,
    w: &mut W,
) -> Result<u64> {
    let mut reader = DecryptingReader::new(r, decryptor);
    Ok(io::copy(&mut reader, w)?)
}
