//! State hashing for fast resume verification.
//!
//! Uses FNV-1a over the encoded snapshot bytes. Not cryptographically
//! secure — the hash exists to cheaply detect divergence between a
//! resumed run and its uninterrupted twin.

use crate::codec::write_snapshot;
use crate::error::CheckpointError;
use crate::snapshot::Snapshot;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed a byte slice into an FNV-1a hash state.
#[inline]
fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash a snapshot's full encoded form.
///
/// Two runs whose snapshots hash equal at the same step carry
/// bit-identical state, random stream included.
pub fn state_hash(snapshot: &Snapshot) -> Result<u64, CheckpointError> {
    let mut buf = Vec::new();
    write_snapshot(&mut buf, snapshot)?;
    Ok(fnv1a(FNV_OFFSET, &buf))
}
