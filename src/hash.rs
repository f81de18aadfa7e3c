//! The key-mixing hash shared by every table variant.
//!
//! [`mix32`] is a 4-round integer avalanche mix: each round folds in eight
//! more bits of the key with a fixed odd multiplier and a 13-bit rotate, and
//! a final xor/multiply cascade scrambles the result. It is a pure function,
//! safe to call from any number of threads at once.

/// Fixed odd multiplier used by every round of [`mix32`].
///
/// This is the 32-bit golden-ratio prime, the same constant xxHash32 and
/// MurmurHash3-style finalizers build on.
const PRIME: u32 = 2654435761;

/// Mixes a 32-bit key into a well-distributed 32-bit hash.
///
/// Deterministic and stateless; equal keys always produce equal hashes.
#[inline]
#[must_use]
pub fn mix32(key: u32) -> u32 {
    let mut h = PRIME.wrapping_add(key.wrapping_mul(PRIME));
    h = h.rotate_left(13);
    h = h.wrapping_mul(PRIME);

    h = h.wrapping_add((key >> 8).wrapping_mul(PRIME));
    h = h.rotate_left(13);
    h = h.wrapping_mul(PRIME);

    h = h.wrapping_add((key >> 16).wrapping_mul(PRIME));
    h = h.rotate_left(13);
    h = h.wrapping_mul(PRIME);

    h = h.wrapping_add((key >> 24).wrapping_mul(PRIME));
    h = h.rotate_left(13);
    h = h.wrapping_mul(PRIME);

    // Round marker, then the final avalanche.
    h ^= 4;
    h ^= h >> 16;
    h = h.wrapping_mul(PRIME);
    h ^= h >> 13;
    h = h.wrapping_mul(PRIME);
    h ^= h >> 16;

    h
}

/// Maps a key to the slot (or bucket) index a probe sequence starts from.
///
/// Implementations must be pure: the same key must always produce the same
/// hash, or lookups would disagree with earlier inserts. The trait is
/// stateless by construction; there is nothing to seed and nothing shared
/// between tables.
pub trait KeyHasher {
    /// Hashes `key` to a 32-bit value; the caller reduces it modulo the
    /// current capacity.
    fn hash(key: u32) -> u32;
}

/// The default [`KeyHasher`], delegating to [`mix32`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MixHash;

impl KeyHasher for MixHash {
    #[inline]
    fn hash(key: u32) -> u32 {
        mix32(key)
    }
}
