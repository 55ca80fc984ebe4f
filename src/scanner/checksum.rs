//! Two-accumulator rolling checksum.
//!
//! Combines a djb2 accumulator (seed 5381, `h * 33 + b`) with an sdbm
//! accumulator (seed 0, `b + (h << 6) + (h << 16) - h`). All arithmetic
//! wraps at 64 bits. This is not collision resistant; a match only means
//! "worth comparing byte for byte".

use super::hasher::Hash;

const DJB2_SEED: u64 = 5381;

/// Incremental djb2/sdbm checksum state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingChecksum {
    djb2: u64,
    sdbm: u64,
}

impl Default for RollingChecksum {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingChecksum {
    #[must_use]
    pub fn new() -> Self {
        Self {
            djb2: DJB2_SEED,
            sdbm: 0,
        }
    }

    /// Feed bytes into both accumulators.
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let b = u64::from(b);
            self.djb2 = (self.djb2 << 5).wrapping_add(self.djb2).wrapping_add(b);
            self.sdbm = b
                .wrapping_add(self.sdbm << 6)
                .wrapping_add(self.sdbm << 16)
                .wrapping_sub(self.sdbm);
        }
    }

    /// The two raw accumulator values `(djb2, sdbm)`.
    #[must_use]
    pub fn accumulators(&self) -> (u64, u64) {
        (self.djb2, self.sdbm)
    }

    /// Widen into a [`Hash`]: djb2 then sdbm, big-endian, zero padded.
    #[must_use]
    pub fn digest(&self) -> Hash {
        let mut out = [0u8; 32];
        out[..8].copy_from_slice(&self.djb2.to_be_bytes());
        out[8..16].copy_from_slice(&self.sdbm.to_be_bytes());
        out
    }

    /// 32-character hex rendering of both accumulators.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:016x}{:016x}", self.djb2, self.sdbm)
    }
}
