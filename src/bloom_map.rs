//! The bucketed table with per-bucket embedded Bloom filters.
//!
//! Storage is an array of 64-byte buckets: an 8-byte Bloom filter followed by
//! seven key/value pairs. An insert lands in the first bucket along the probe
//! sequence that has a free pair slot; a bucket only spills its overflow to
//! the next bucket once all seven slots are taken, so a non-full bucket is
//! always the end of its probe chain. Lookups use the filter to skip the pair
//! scan cheaply and, crucially, to stop early: if a bucket's filter rules the
//! key out *and* the bucket is not full, the key cannot exist anywhere in the
//! table.
//!
//! Filter bits are only ever set, never cleared (there is no deletion), so
//! the filter is always a superset of the keys physically present and false
//! negatives cannot occur.

use core::fmt::Debug;
use core::marker::PhantomData;

use xxhash_rust::xxh3::xxh3_128;

use crate::Error;
use crate::ProbeStats;
use crate::growth::GrowthPolicy;
use crate::hash::KeyHasher;
use crate::hash::MixHash;

/// Resize once `len / capacity` exceeds this after an insert.
///
/// Higher than the flat tables' threshold: capacity counts buckets, and each
/// bucket absorbs up to seven entries before it spills.
const LOAD_FACTOR: f64 = 0.8;

/// Capacity past which the growth policy sticks to its minimum factor.
const GROWTH_CEILING: u32 = 10_000_000;

/// Pair slots per bucket.
const BUCKET_SLOTS: usize = 7;

/// Width of the per-bucket Bloom filter bit field.
const FILTER_BITS: u32 = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Pair {
    key: u32,
    value: u32,
}

/// One 64-byte bucket: the filter word plus seven pair slots.
///
/// Slots fill low to high and are never compacted, so the first zero key
/// marks the end of the occupied prefix and the bucket is full exactly when
/// its last slot's key is non-zero.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
struct Bucket {
    filter: u64,
    pairs: [Pair; BUCKET_SLOTS],
}

impl Bucket {
    #[inline]
    fn may_contain(&self, mask: u64) -> bool {
        self.filter & mask == mask
    }

    #[inline]
    fn note_key(&mut self, mask: u64) {
        self.filter |= mask;
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.pairs[BUCKET_SLOTS - 1].key != 0
    }

    #[inline]
    fn find(&self, key: u32) -> Option<usize> {
        self.pairs.iter().position(|pair| pair.key == key)
    }

    /// Index of the first free slot, `None` when the bucket is full.
    #[inline]
    fn first_empty(&self) -> Option<usize> {
        self.pairs.iter().position(|pair| pair.key == 0)
    }
}

/// Derives the bucket-filter bit mask for a key: the 4-byte little-endian
/// key encoding is run through a 128-bit hash and the digest is split into
/// four 32-bit words, each selecting one of the 64 filter bits.
fn bloom_mask(key: u32) -> u64 {
    let digest = xxh3_128(&key.to_le_bytes());
    let words = [
        digest as u32,
        (digest >> 32) as u32,
        (digest >> 64) as u32,
        (digest >> 96) as u32,
    ];

    let mut mask = 0u64;
    for word in words {
        mask |= 1u64 << (word % FILTER_BITS);
    }
    mask
}

/// A `u32 -> u32` hash table over Bloom-guarded 64-byte buckets.
///
/// # Examples
///
/// ```rust
/// use packmap::BloomMap;
///
/// let mut map = BloomMap::with_capacity(8);
/// map.insert(5, 100)?;
/// map.insert(13, 200)?;
/// assert_eq!(map.get(5), Some(100));
/// assert_eq!(map.get(7), None);
/// # Ok::<(), packmap::Error>(())
/// ```
pub struct BloomMap<H: KeyHasher = MixHash> {
    buckets: Box<[Bucket]>,
    len: usize,
    growth: GrowthPolicy,
    stats: ProbeStats,
    _hasher: PhantomData<H>,
}

/// Outcome of one probe-and-write pass, carrying the bucket probe length.
enum Written {
    Inserted(u32),
    Updated(u32),
}

impl BloomMap<MixHash> {
    /// Creates a table with the given initial bucket count (clamped to at
    /// least 1) and the default [`MixHash`] bucket hash.
    #[must_use]
    pub fn with_capacity(capacity: u32) -> Self {
        Self::with_key_hasher(capacity)
    }
}

impl<H: KeyHasher> BloomMap<H> {
    /// Creates a table with the given initial bucket count (clamped to at
    /// least 1), hashing keys to buckets with `H`.
    #[must_use]
    pub fn with_key_hasher(capacity: u32) -> Self {
        BloomMap {
            buckets: empty_store(capacity.max(1)),
            len: 0,
            growth: GrowthPolicy::new(GROWTH_CEILING),
            stats: ProbeStats::default(),
            _hasher: PhantomData,
        }
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket count of the backing store.
    ///
    /// Each bucket holds up to seven entries, so the entry capacity is seven
    /// times this.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Probe statistics for the current geometry. Probe lengths count
    /// bucket hops, not slot scans.
    #[inline]
    #[must_use]
    pub fn probe_stats(&self) -> ProbeStats {
        self.stats
    }

    /// Inserts `key -> value`, overwriting any previous value for `key`.
    ///
    /// May grow the table. Fails with [`Error::ZeroKey`] for the reserved
    /// key 0 and with [`Error::Full`] if every bucket was probed without
    /// finding space (unreachable while resizing is active).
    pub fn insert(&mut self, key: u32, value: u32) -> Result<(), Error> {
        if key == 0 {
            return Err(Error::ZeroKey);
        }

        match probe_insert::<H>(&mut self.buckets, key, value)? {
            Written::Inserted(probes) => {
                self.len += 1;
                self.stats.record(probes);
                if self.len as f64 / self.buckets.len() as f64 > LOAD_FACTOR {
                    self.grow()?;
                }
            }
            Written::Updated(probes) => {
                self.stats.record(probes);
            }
        }
        Ok(())
    }

    /// Looks up `key`, returning its value or `None` if absent.
    ///
    /// A bucket whose filter rules the key out and which still has free
    /// slots terminates the search: inserts always fill a non-full bucket
    /// rather than moving past it, so the key can be nowhere else.
    #[must_use]
    pub fn get(&self, key: u32) -> Option<u32> {
        if key == 0 {
            return None;
        }

        let capacity = self.buckets.len();
        let mask = bloom_mask(key);
        let mut index = (H::hash(key) % capacity as u32) as usize;

        for _ in 0..capacity {
            let bucket = &self.buckets[index];
            if !bucket.may_contain(mask) && !bucket.is_full() {
                return None;
            }
            if let Some(i) = bucket.find(key) {
                return Some(bucket.pairs[i].value);
            }
            index += 1;
            if index == capacity {
                index = 0;
            }
        }
        None
    }

    /// Replaces the store with a larger one and replays every occupied slot
    /// through the normal insert path, rebuilding filters and fullness for
    /// the new geometry.
    fn grow(&mut self) -> Result<(), Error> {
        let next = self.growth.next_capacity(self.capacity());
        let mut buckets = empty_store(next);

        for bucket in &self.buckets {
            for pair in &bucket.pairs {
                if pair.key == 0 {
                    // Slots fill low to high; the first zero key ends the
                    // bucket's occupied prefix.
                    break;
                }
                probe_insert::<H>(&mut buckets, pair.key, pair.value)?;
            }
        }

        self.buckets = buckets;
        self.stats.reset();
        Ok(())
    }
}

impl<H: KeyHasher> Debug for BloomMap<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BloomMap")
            .field("len", &self.len)
            .field("buckets", &self.buckets.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<H: KeyHasher> Clone for BloomMap<H> {
    fn clone(&self) -> Self {
        BloomMap {
            buckets: self.buckets.clone(),
            len: self.len,
            growth: self.growth,
            stats: self.stats,
            _hasher: PhantomData,
        }
    }
}

fn empty_store(capacity: u32) -> Box<[Bucket]> {
    vec![Bucket::default(); capacity as usize].into_boxed_slice()
}

/// Probes buckets from `hash(key) % capacity`. A filter hit triggers an
/// exact scan and in-place update on a match; otherwise the pair lands in
/// the current bucket's first free slot, or the probe moves on if the bucket
/// is full. Visits each bucket at most once; a full sweep with no landing
/// spot reports [`Error::Full`].
fn probe_insert<H: KeyHasher>(
    buckets: &mut [Bucket],
    key: u32,
    value: u32,
) -> Result<Written, Error> {
    let capacity = buckets.len();
    let mask = bloom_mask(key);
    let mut index = (H::hash(key) % capacity as u32) as usize;
    let mut probes = 0u32;

    loop {
        let bucket = &mut buckets[index];
        if bucket.may_contain(mask) {
            if let Some(i) = bucket.find(key) {
                bucket.pairs[i].value = value;
                return Ok(Written::Updated(probes));
            }
        }

        if let Some(i) = bucket.first_empty() {
            bucket.pairs[i] = Pair { key, value };
            bucket.note_key(mask);
            return Ok(Written::Inserted(probes));
        }

        probes += 1;
        if probes as usize >= capacity {
            return Err(Error::Full);
        }
        index += 1;
        if index == capacity {
            index = 0;
        }
    }
}
