#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use core::fmt;

pub mod bloom_map;
pub mod growth;
pub mod hash;
pub mod open_map;

pub use bloom_map::BloomMap;
pub use growth::GrowthPolicy;
pub use hash::KeyHasher;
pub use hash::MixHash;
pub use open_map::OpenMap;
pub use open_map::PackedMap;
pub use open_map::PairedMap;
pub use open_map::SlotCodec;

/// Errors reported by `insert` on any table variant.
///
/// `get` never fails; absence is reported as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Key `0` is reserved as the empty-slot sentinel and cannot be stored.
    ZeroKey,
    /// A probe sweep visited every slot without finding space.
    ///
    /// Unreachable through normal use: the load-factor check resizes tables
    /// long before saturation. It exists so a degenerate insertion pattern
    /// fails loudly instead of probing forever.
    Full,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroKey => write!(f, "key 0 is reserved as the empty-slot sentinel"),
            Error::Full => write!(f, "table is full"),
        }
    }
}

impl std::error::Error for Error {}

/// Instance-scoped probe statistics.
///
/// Each table records, per `insert`, how many extra slots (or buckets, for
/// [`BloomMap`]) it had to step past before the operation settled. Statistics
/// are reset when the table resizes, so they always describe the current
/// geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// Longest probe sequence observed since the last resize.
    pub max_probe: u32,
    /// Sum of all probe lengths since the last resize.
    pub total_probes: u64,
    /// Number of recorded operations since the last resize.
    pub operations: u64,
}

impl ProbeStats {
    #[inline]
    pub(crate) fn record(&mut self, probes: u32) {
        if probes > self.max_probe {
            self.max_probe = probes;
        }
        self.total_probes += u64::from(probes);
        self.operations += 1;
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        *self = ProbeStats::default();
    }

    /// Mean probe length per recorded operation, `0.0` when nothing has been
    /// recorded yet.
    pub fn average(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.total_probes as f64 / self.operations as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_stats_average() {
        let mut stats = ProbeStats::default();
        assert_eq!(stats.average(), 0.0);

        stats.record(0);
        stats.record(4);
        stats.record(2);
        assert_eq!(stats.max_probe, 4);
        assert_eq!(stats.operations, 3);
        assert!((stats.average() - 2.0).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats, ProbeStats::default());
    }

    #[test]
    fn error_display() {
        assert!(Error::ZeroKey.to_string().contains("sentinel"));
        assert!(Error::Full.to_string().contains("full"));
    }
}
