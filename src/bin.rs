//! Component B: the immutable-mean bin container.

use crate::error::HistogramError;
use crate::target::Target;

/// One `(mean, count, target)` triple of the reservoir.
///
/// `mean` is immutable for a given `Bin` value; moving a bin to a new mean
/// is modelled by the reservoir removing and reinserting, never by mutating
/// `mean` in place. `count` is a real number rather than an integer because
/// [`Bin::combine`] produces weighted means of possibly fractional counts
/// once bins have themselves been produced by earlier merges.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub mean: f64,
    pub count: f64,
    pub target: Target,
}

impl Bin {
    pub fn new(mean: f64, count: f64, target: Target) -> Self {
        Bin {
            mean,
            count,
            target,
        }
    }

    /// Combine two bins into a new one: counts add, the mean becomes the
    /// count-weighted average of the two means, and the targets add via the
    /// target algebra. Used by merge-down when the reservoir exceeds its
    /// capacity.
    pub fn combine(a: &Bin, b: &Bin) -> Result<Bin, HistogramError> {
        let count = a.count + b.count;
        let mean = (a.mean * a.count + b.mean * b.count) / count;
        let mut target = a.target.clone();
        target.sum(&b.target)?;
        Ok(Bin {
            mean,
            count,
            target,
        })
    }

    /// Add `other` into `self` in place. Both bins must share a mean; this
    /// models the "exact hit" path, where a new observation lands exactly
    /// on an existing bin.
    pub fn accumulate(&mut self, other: &Bin) -> Result<(), HistogramError> {
        if self.mean != other.mean {
            return Err(HistogramError::BinUpdate {
                left: self.mean,
                right: other.mean,
            });
        }
        self.count += other.count;
        self.target.sum(&other.target)
    }

    /// Fold `other`'s count and target into `self` in place, keeping
    /// `self.mean` fixed regardless of `other.mean`. Used by freeze-mode
    /// routing, where a new observation is accumulated into the nearest
    /// existing bin without moving that bin's position.
    pub fn absorb(&mut self, other: &Bin) -> Result<(), HistogramError> {
        self.count += other.count;
        self.target.sum(&other.target)
    }
}

/// Map `-0.0` to `+0.0` so it can be used as a reservoir key; `NaN` and
/// infinite values are rejected at the public boundary before this is ever
/// called.
pub fn canonical_mean(p: f64) -> f64 {
    debug_assert!(p.is_finite(), "mean must be finite, got {p}");
    if p == 0.0 {
        0.0
    } else {
        p
    }
}
