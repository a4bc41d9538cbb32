use crate::torrent::PieceHash;
use sha1::{Digest, Sha1};

/// Length of a SHA-1 digest in bytes
pub const DIGEST_LEN: usize = 20;

/// Incremental SHA-1 over an arbitrary byte sequence
#[derive(Clone, Default)]
pub struct DigestEngine {
    hasher: Sha1,
}

impl DigestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finish(self) -> PieceHash {
        PieceHash::new(self.hasher.finalize().into())
    }

    /// Finish into a caller supplied 20 byte slot
    pub fn finish_into(self, dest: &mut [u8]) {
        dest.copy_from_slice(&self.hasher.finalize());
    }
}

/// SHA-1 of `data` in one call
pub fn sha1(data: &[u8]) -> PieceHash {
    let mut engine = DigestEngine::new();
    engine.update(data);
    engine.finish()
}
