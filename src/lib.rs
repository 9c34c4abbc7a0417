//! A bounded-memory streaming histogram following the Ben-Haim/Tyree
//! "Streaming Parallel Decision Tree" construction: a reservoir of at most
//! `B` `(mean, count)` bins that merges its closest pair whenever a new
//! observation would push it over capacity, plus Tyree's extension of
//! carrying a per-bin target summary (numeric, categorical, grouped, or a
//! nested histogram) alongside each bin's count.
//!
//! ```
//! use streamhist::{Histogram, HistogramOptions};
//!
//! let mut h = Histogram::create(HistogramOptions { bins: 32, ..Default::default() }).unwrap();
//! for x in [1.0, 2.0, 2.0, 3.0, 100.0] {
//!     h.insert(Some(x)).unwrap();
//! }
//! assert_eq!(h.total_count(), 5.0);
//! let median = h.percentiles(&[0.5])[0].1;
//! assert!((1.0..=3.0).contains(&median));
//! ```
#![forbid(unsafe_code)]

mod bin;
mod error;
mod histogram;
mod reservoir;
mod serde_impl;
mod target;

pub use bin::Bin;
pub use error::HistogramError;
pub use histogram::{Histogram, HistogramOptions, ReservoirKind};
pub use target::{GroupChildKind, GroupValue, Target, TargetKind};
