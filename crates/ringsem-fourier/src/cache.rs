//! On-disk cache of ring plan records.
//!
//! One fixed-size record per ring size. A missing or damaged file never
//! blocks a run. All integers are little-endian.
//!
//! ```text
//! [MAGIC "RSTP"] [VERSION u8] [COUNT u32]
//! COUNT × ([NR u32] [FORWARD_SCRATCH u32] [INVERSE_SCRATCH u32])
//! [FNV-1a u64 over every preceding byte]
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::plan::PlanRecord;

/// File magic.
pub const MAGIC: &[u8; 4] = b"RSTP";
/// Current format version.
pub const FORMAT_VERSION: u8 = 2;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

// ── CacheError ─────────────────────────────────────────────────────

/// Reasons a cache file could not be used.
#[derive(Debug)]
pub enum CacheError {
    /// The file could not be read or written.
    Io(io::Error),
    /// The file does not start with `b"RSTP"`.
    InvalidMagic,
    /// The file was written by an incompatible version.
    UnsupportedVersion {
        /// Version byte found in the file.
        found: u8,
    },
    /// The trailing checksum does not match the content.
    ChecksumMismatch {
        /// Checksum stored in the file.
        stored: u64,
        /// Checksum of the content.
        computed: u64,
    },
    /// The content is truncated or inconsistent.
    Malformed {
        /// What went wrong.
        detail: String,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"RSTP\")"),
            Self::UnsupportedVersion { found } => write!(f, "unsupported cache version {found}"),
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "checksum mismatch: stored={stored:#018x}, computed={computed:#018x}"
            ),
            Self::Malformed { detail } => write!(f, "malformed cache: {detail}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ── Byte cursor ────────────────────────────────────────────────────

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CacheError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
        let end = end.ok_or_else(|| CacheError::Malformed {
            detail: format!("truncated at byte {}", self.pos),
        })?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_u32_le(&mut self) -> Result<u32, CacheError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }
}

// ── PlanCache ──────────────────────────────────────────────────────

/// A plan record file keyed by ring size.
#[derive(Clone, Debug)]
pub struct PlanCache {
    path: PathBuf,
}

impl PlanCache {
    /// Cache stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode records into the cache format.
    pub fn encode(records: &[PlanRecord]) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAGIC.len() + 1 + 4 + records.len() * 12 + 8);
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&(records.len() as u32).to_le_bytes());
        for r in records {
            for v in [r.nr, r.forward_scratch, r.inverse_scratch] {
                out.extend_from_slice(&(v as u32).to_le_bytes());
            }
        }
        let sum = fnv1a(&out);
        out.extend_from_slice(&sum.to_le_bytes());
        out
    }

    /// Decode records from the cache format.
    pub fn decode(bytes: &[u8]) -> Result<Vec<PlanRecord>, CacheError> {
        if bytes.len() < MAGIC.len() + 1 + 4 + 8 {
            return Err(CacheError::Malformed {
                detail: format!("file too short ({} bytes)", bytes.len()),
            });
        }
        let (body, tail) = bytes.split_at(bytes.len() - 8);
        if &body[..4] != MAGIC {
            return Err(CacheError::InvalidMagic);
        }
        if body[4] != FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion { found: body[4] });
        }
        let mut stored = [0u8; 8];
        stored.copy_from_slice(tail);
        let stored = u64::from_le_bytes(stored);
        let computed = fnv1a(body);
        if stored != computed {
            return Err(CacheError::ChecksumMismatch { stored, computed });
        }

        let mut cur = Cursor { bytes: body, pos: 5 };
        let count = cur.read_u32_le()? as usize;
        let mut records = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            let nr = cur.read_u32_le()? as usize;
            let forward_scratch = cur.read_u32_le()? as usize;
            let inverse_scratch = cur.read_u32_le()? as usize;
            if nr == 0 {
                return Err(CacheError::Malformed {
                    detail: "record for an empty ring".to_string(),
                });
            }
            records.push(PlanRecord {
                nr,
                forward_scratch,
                inverse_scratch,
            });
        }
        if cur.pos != body.len() {
            return Err(CacheError::Malformed {
                detail: format!("{} trailing bytes", body.len() - cur.pos),
            });
        }
        Ok(records)
    }

    /// Read all records stored in the file.
    pub fn load(&self) -> Result<Vec<PlanRecord>, CacheError> {
        let bytes = fs::read(&self.path)?;
        Self::decode(&bytes)
    }

    /// Overwrite the file with `records`.
    pub fn store(&self, records: &[PlanRecord]) -> Result<(), CacheError> {
        fs::write(&self.path, Self::encode(records))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::RingPlan;

    fn records(max_nr: usize) -> Vec<PlanRecord> {
        (1..=max_nr).map(|nr| RingPlan::new(nr).record()).collect()
    }

    #[test]
    fn encode_decode_preserves_records() {
        let records = records(6);
        let decoded = PlanCache::decode(&PlanCache::encode(&records)).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn file_size_is_linear_in_ring_count() {
        let small = PlanCache::encode(&records(8)).len();
        let large = PlanCache::encode(&records(16)).len();
        assert_eq!(large - small, 8 * 12);
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut bytes = PlanCache::encode(&records(3));
        bytes[12] ^= 0x40;
        assert!(matches!(
            PlanCache::decode(&bytes),
            Err(CacheError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = PlanCache::encode(&records(2));
        bytes[0] = b'X';
        assert!(matches!(
            PlanCache::decode(&bytes),
            Err(CacheError::InvalidMagic)
        ));
    }

    #[test]
    fn older_version_is_rejected() {
        let mut bytes = PlanCache::encode(&records(2));
        bytes[4] = 1;
        assert!(matches!(
            PlanCache::decode(&bytes),
            Err(CacheError::UnsupportedVersion { found: 1 })
        ));
    }

    #[test]
    fn short_file_is_malformed() {
        assert!(matches!(
            PlanCache::decode(b"RST"),
            Err(CacheError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let cache = PlanCache::new(std::env::temp_dir().join("ringsem-no-such-cache.bin"));
        assert!(matches!(cache.load(), Err(CacheError::Io(_))));
    }
}
