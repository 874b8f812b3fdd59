//! Dedicated logic for route costs.
//!
//! Costs are additive: the cost of a route is the link cost to the advertising
//! neighbour plus the cost that neighbour announced. A single large sentinel
//! value stands in for "unreachable / not yet learned", so relaxation can
//! proceed with normal comparisons and naturally disfavor unknown paths.

use core::fmt;
use std::ops::Add;

/// Value of the unreachable sentinel cost.
const METRIC_UNREACHABLE: u32 = 9_999_999;

/// A `Metric` is used to indicate the cost associated with a route. A lower
/// `Metric` means a route is more favorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Metric(u32);

impl Metric {
    /// Create a new `Metric` with the given value.
    pub const fn new(value: u32) -> Self {
        Metric(value)
    }

    /// Creates a new unreachable `Metric`.
    pub const fn unreachable() -> Self {
        Metric(METRIC_UNREACHABLE)
    }

    /// Checks if this metric indicates an unreachable route.
    pub const fn is_unreachable(&self) -> bool {
        self.0 >= METRIC_UNREACHABLE
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unreachable() {
            f.pad("unreachable")
        } else {
            f.write_fmt(format_args!("{}", self.0))
        }
    }
}

impl From<u32> for Metric {
    fn from(value: u32) -> Self {
        Metric(value)
    }
}

impl From<Metric> for u32 {
    fn from(value: Metric) -> Self {
        value.0
    }
}

impl Add for Metric {
    type Output = Self;

    fn add(self, rhs: Metric) -> Self::Output {
        if self.is_unreachable() || rhs.is_unreachable() {
            return Metric::unreachable();
        }
        Metric(
            self.0
                .checked_add(rhs.0)
                .map(|r| r.min(METRIC_UNREACHABLE))
                .unwrap_or(METRIC_UNREACHABLE),
        )
    }
}
