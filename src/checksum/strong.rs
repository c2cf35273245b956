//! Keyed strong checksum: an MD4 digest over `seed ‖ bytes` (spec §3).
//!
//! The seed is mixed in up front so that two sessions with different
//! seeds never produce colliding strong checksums for the same bytes,
//! closing the crafted-collision attack the redo phase (§8, scenario 5)
//! exists to recover from.

use md4::{Digest as _, Md4};

use crate::wire::MD4_SUM_LENGTH;

/// Streaming keyed MD4 state, seeded once at construction.
#[derive(Clone)]
pub struct RunningDigest {
    inner: Md4,
}

impl RunningDigest {
    #[must_use]
    pub fn new(seed: u32) -> Self {
        let mut inner = Md4::new();
        inner.update(seed.to_le_bytes());
        Self { inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    #[must_use]
    pub fn finalize(self) -> [u8; MD4_SUM_LENGTH] {
        self.inner.finalize().into()
    }
}

/// Full 16-byte keyed digest of `data` in one shot.
#[must_use]
pub fn digest(seed: u32, data: &[u8]) -> [u8; MD4_SUM_LENGTH] {
    let mut rd = RunningDigest::new(seed);
    rd.update(data);
    rd.finalize()
}

/// The first `len` bytes of the keyed digest — the strong-checksum
/// prefix used in block signatures (short in phase 1, full in phase 2).
#[must_use]
pub fn prefix(seed: u32, data: &[u8], len: usize) -> Vec<u8> {
    let full = digest(seed, data);
    full[..len.min(MD4_SUM_LENGTH)].to_vec()
}
