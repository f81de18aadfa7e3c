//! Adaptive growth policy shared by every table variant.
//!
//! Small tables multiply aggressively so a handful of early resizes gets them
//! to a workable size; large tables grow conservatively to bound the memory
//! spike of a resize. The growth factor is interpolated linearly in `log10`
//! of the current capacity, from [`MAX_FACTOR`] at capacity 1 down to
//! [`MIN_FACTOR`] at the policy's ceiling, and stays at [`MIN_FACTOR`] past
//! the ceiling.

/// Growth factor applied once capacity reaches the ceiling.
pub const MIN_FACTOR: f64 = 2.0;

/// Growth factor applied to a table of capacity 1.
pub const MAX_FACTOR: f64 = 20.0;

/// A log-interpolated growth curve with a fixed capacity ceiling.
///
/// The ceiling is variant-specific: the flat slot tables taper off at one
/// million slots, the bucketed table at ten million buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    ceiling: u32,
}

impl GrowthPolicy {
    /// Creates a policy that reaches [`MIN_FACTOR`] at `ceiling`.
    #[must_use]
    pub const fn new(ceiling: u32) -> Self {
        GrowthPolicy { ceiling }
    }

    /// Multiplicative growth factor for a table currently at `capacity`.
    ///
    /// Always within `[MIN_FACTOR, MAX_FACTOR]`.
    #[must_use]
    pub fn factor(&self, capacity: u32) -> f64 {
        if capacity >= self.ceiling {
            return MIN_FACTOR;
        }

        let span = f64::from(self.ceiling).log10();
        let t = f64::from(capacity.max(1)).log10() / span;
        MAX_FACTOR - (MAX_FACTOR - MIN_FACTOR) * t
    }

    /// Capacity to allocate when growing a table currently at `capacity`:
    /// `ceil(capacity * factor)`, saturating at `u32::MAX`.
    #[must_use]
    pub fn next_capacity(&self, capacity: u32) -> u32 {
        let grown = (f64::from(capacity) * self.factor(capacity)).ceil();
        if grown >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            grown as u32
        }
    }
}
