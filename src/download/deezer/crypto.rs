//! Stripe decryption for Deezer streams.
//!
//! Streams are split into 2048-byte chunks. Every third full chunk, starting
//! with the first, is Blowfish-CBC encrypted with a per-track key and a fixed
//! IV; all other chunks and any trailing partial chunk are plain.

use blowfish::Blowfish;
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding};
use md5::{Digest, Md5};

use crate::download::domain::SourceError;

const CHUNK_SIZE: usize = 2048;
const KEY_SECRET: &[u8; 16] = b"g4el58wc0zvf9na1";
const IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Derive the Blowfish key for a track id.
pub fn track_key(track_id: &str) -> [u8; 16] {
    let hash = format!("{:x}", Md5::digest(track_id.as_bytes()));
    let hash = hash.as_bytes();

    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = hash[i] ^ hash[i + 16] ^ KEY_SECRET[i];
    }
    key
}

/// Incremental decryptor fed with arbitrarily sized network chunks.
pub struct StripeDecryptor {
    key: [u8; 16],
    pending: Vec<u8>,
    chunk_index: u64,
}

impl StripeDecryptor {
    pub fn new(track_id: &str) -> Self {
        Self {
            key: track_key(track_id),
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
            chunk_index: 0,
        }
    }

    /// Feed bytes and return whatever full chunks are now available, decrypted.
    pub fn update(&mut self, data: &[u8]) -> Result<Vec<u8>, SourceError> {
        self.pending.extend_from_slice(data);
        let ready = self.pending.len() / CHUNK_SIZE * CHUNK_SIZE;
        let mut out: Vec<u8> = self.pending.drain(..ready).collect();

        for chunk in out.chunks_exact_mut(CHUNK_SIZE) {
            if self.chunk_index % 3 == 0 {
                decrypt_chunk(&self.key, chunk)?;
            }
            self.chunk_index += 1;
        }
        Ok(out)
    }

    /// Remaining bytes. A trailing partial chunk is never encrypted.
    pub fn finish(self) -> Vec<u8> {
        self.pending
    }
}

fn decrypt_chunk(key: &[u8; 16], chunk: &mut [u8]) -> Result<(), SourceError> {
    cbc::Decryptor::<Blowfish>::new_from_slices(key, &IV)
        .map_err(|e| SourceError::Decrypt(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(chunk)
        .map_err(|e| SourceError::Decrypt(e.to_string()))?;
    Ok(())
}

/// Encrypt `plain` the way Deezer serves it, for tests.
#[cfg(test)]
pub fn encrypt_stream(track_id: &str, plain: &[u8]) -> Vec<u8> {
    use cbc::cipher::BlockEncryptMut;

    let key = track_key(track_id);
    let mut data = plain.to_vec();
    for (index, chunk) in data.chunks_mut(CHUNK_SIZE).enumerate() {
        if index % 3 == 0 && chunk.len() == CHUNK_SIZE {
            cbc::Encryptor::<Blowfish>::new_from_slices(&key, &IV)
                .unwrap()
                .encrypt_padded_mut::<NoPadding>(chunk, CHUNK_SIZE)
                .unwrap();
        }
    }
    data
}
