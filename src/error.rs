use thiserror::Error;

use crate::target::TargetKind;

/// Errors raised by the public [`Histogram`](crate::Histogram) surface.
///
/// This is a closed set: every failure mode the engine can surface to a
/// caller has a variant here. Internal invariant violations (a means list
/// that lost its ordering, a gap index out of sync with the reservoir) are
/// programming bugs and `debug_assert!` instead of going through this type.
#[derive(Debug, Error, PartialEq)]
pub enum HistogramError {
    /// An insert or merge was attempted with a target shape incompatible
    /// with the one already latched on this histogram.
    #[error("target type mismatch: histogram expects {expected:?}, got {found:?}")]
    TypeMismatch {
        expected: TargetKind,
        found: TargetKind,
    },

    /// A categorical insert named a category outside the declared,
    /// array-backed category list.
    #[error("unknown category {category:?} (declared categories: {declared:?})")]
    UnknownCategory {
        category: String,
        declared: Vec<String>,
    },

    /// `sum` / `extended_sum` / `average_target` was called on a histogram
    /// with no bins.
    #[error("operation requires at least one bin, but the histogram is empty")]
    Empty,

    /// Reserved for callers that want a strict-range query instead of the
    /// default clamping behavior; the engine itself never raises this.
    #[error("value {0} is out of the histogram's observed [minimum, maximum] range")]
    OutOfRange(f64),

    /// Attempted to accumulate two bins with different means. This can only
    /// happen through a programming error in the reservoir and should never
    /// reach a caller.
    #[error("cannot accumulate bins with different means ({left} != {right})")]
    BinUpdate { left: f64, right: f64 },
}
