//! Component D: the public histogram facade.
//!
//! This ties the reservoir (component C) and the target algebra
//! (component A, via bins, component B) together into the operations
//! documented for callers: point/bin insertion, merging, and the
//! sum/density/uniform/percentile/average-target query family.

use crate::bin::{canonical_mean, Bin};
use crate::error::HistogramError;
use crate::reservoir::Reservoir;
use crate::target::{GroupChildKind, GroupValue, Target, TargetKind};

/// Which concrete data structure backs the reservoir's ordered bin index.
///
/// Per ��4.3 both settings currently resolve to the same `BTreeMap`-backed
/// engine; the knob is accepted and carried for forward compatibility with
/// an array-backed implementation and so creation options round-trip, but
/// it does not change behavior today (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservoirKind {
    Array,
    Tree,
}

impl ReservoirKind {
    fn resolve_default(bins: usize) -> ReservoirKind {
        if bins <= 256 {
            ReservoirKind::Array
        } else {
            ReservoirKind::Tree
        }
    }
}

/// Creation options for a new [`Histogram`]. See ��6.
#[derive(Debug, Clone)]
pub struct HistogramOptions {
    pub bins: usize,
    pub gap_weighted: bool,
    pub categories: Option<Vec<String>>,
    pub group_types: Option<Vec<GroupChildKind>>,
    pub freeze: Option<u64>,
    pub reservoir: Option<ReservoirKind>,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        HistogramOptions {
            bins: 64,
            gap_weighted: false,
            categories: None,
            group_types: None,
            freeze: None,
            reservoir: None,
        }
    }
}

/// A bounded-memory streaming approximation of a one-dimensional numeric
/// distribution, following the Ben-Haim/Tyree streaming histogram
/// construction.
#[derive(Debug, Clone)]
pub struct Histogram {
    pub(crate) max_bins: usize,
    pub(crate) gap_weighted: bool,
    pub(crate) freeze_threshold: Option<f64>,
    pub(crate) categories: Option<Vec<String>>,
    pub(crate) group_types: Option<Vec<GroupChildKind>>,
    pub(crate) reservoir_kind: ReservoirKind,
    pub(crate) target_kind: Option<TargetKind>,
    pub(crate) reservoir: Reservoir,
    pub(crate) total_count: f64,
    pub(crate) missing_count: f64,
    pub(crate) missing_target: Option<Target>,
    pub(crate) minimum: Option<f64>,
    pub(crate) maximum: Option<f64>,
}

impl Histogram {
    /// Create an empty histogram from `options`.
    ///
    /// # Panics
    ///
    /// Panics if `options.bins == 0`; `B >= 1` is a precondition, not a
    /// recoverable error (��4.1).
    pub fn create(options: HistogramOptions) -> Result<Histogram, HistogramError> {
        assert!(options.bins >= 1, "bins must be >= 1, got 0");
        if options.categories.is_some() && options.group_types.is_some() {
            return Err(HistogramError::TypeMismatch {
                expected: TargetKind::CategoricalArray,
                found: TargetKind::Group(Vec::new()),
            });
        }
        let reservoir_kind = options
            .reservoir
            .unwrap_or_else(|| ReservoirKind::resolve_default(options.bins));
        let target_kind = if options.categories.is_some() {
            Some(TargetKind::CategoricalArray)
        } else {
            options
                .group_types
                .as_ref()
                .map(|kinds| TargetKind::Group(kinds.iter().map(|k| (*k).into()).collect()))
        };

        tracing::debug!(
            bins = options.bins,
            gap_weighted = options.gap_weighted,
            ?reservoir_kind,
            freeze = ?options.freeze,
            "creating histogram"
        );

        Ok(Histogram {
            max_bins: options.bins,
            gap_weighted: options.gap_weighted,
            freeze_threshold: options.freeze.map(|f| f as f64),
            categories: options.categories,
            group_types: options.group_types,
            reservoir_kind,
            target_kind,
            reservoir: Reservoir::new(options.gap_weighted),
            total_count: 0.0,
            missing_count: 0.0,
            missing_target: None,
            minimum: None,
            maximum: None,
        })
    }

    /// Create an empty histogram with `bins` capacity and otherwise default
    /// options.
    pub fn with_bins(bins: usize) -> Histogram {
        Histogram::create(HistogramOptions {
            bins,
            ..Default::default()
        })
        .expect("default options never conflict")
    }

    pub(crate) fn empty_clone(&self) -> Histogram {
        Histogram {
            max_bins: self.max_bins,
            gap_weighted: self.gap_weighted,
            freeze_threshold: self.freeze_threshold,
            categories: None,
            group_types: None,
            reservoir_kind: self.reservoir_kind,
            target_kind: None,
            reservoir: Reservoir::new(self.gap_weighted),
            total_count: 0.0,
            missing_count: 0.0,
            missing_target: None,
            minimum: None,
            maximum: None,
        }
    }

    // ---- accessors -----------------------------------------------------

    pub fn max_bins(&self) -> usize {
        self.max_bins
    }

    pub fn gap_weighted(&self) -> bool {
        self.gap_weighted
    }

    pub fn freeze_threshold(&self) -> Option<u64> {
        self.freeze_threshold.map(|f| f as u64)
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.categories.as_deref()
    }

    pub fn group_types(&self) -> Option<&[GroupChildKind]> {
        self.group_types.as_deref()
    }

    pub fn reservoir_kind(&self) -> ReservoirKind {
        self.reservoir_kind
    }

    pub fn target_kind(&self) -> Option<&TargetKind> {
        self.target_kind.as_ref()
    }

    pub fn total_count(&self) -> f64 {
        self.total_count
    }

    pub fn missing_count(&self) -> f64 {
        self.missing_count
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    pub fn is_empty(&self) -> bool {
        self.reservoir.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reservoir.len()
    }

    pub fn bins(&self) -> Vec<Bin> {
        self.reservoir.iter().cloned().collect()
    }

    /// The missing-value aggregate represented as a bin-shaped pair
    /// `(count, target)`, or `None` if no point has ever been inserted with
    /// an absent position.
    pub fn missing_bin(&self) -> Option<(f64, Target)> {
        if self.missing_count > 0.0 {
            Some((
                self.missing_count,
                self.missing_target
                    .clone()
                    .unwrap_or_else(|| self.empty_target_template()),
            ))
        } else {
            None
        }
    }

    /// The sum of every bin's target, via the target algebra. Does not
    /// include the missing-value aggregate.
    pub fn total_target_sum(&self) -> Target {
        let mut acc = self.empty_target_template();
        for bin in self.reservoir.iter() {
            acc.sum(&bin.target)
                .expect("bin targets share the histogram's latched kind");
        }
        acc
    }

    fn empty_target_template(&self) -> Target {
        match &self.target_kind {
            Some(kind) => Target::blank(kind, self.categories.as_deref()),
            None => Target::None,
        }
    }

    // ---- insertion -------------------------------------------------------

    fn latch_target_kind(&mut self, kind: TargetKind) -> Result<(), HistogramError> {
        match &self.target_kind {
            None => {
                self.target_kind = Some(kind);
                Ok(())
            }
            Some(existing) if *existing == kind => Ok(()),
            Some(existing) => Err(HistogramError::TypeMismatch {
                expected: existing.clone(),
                found: kind,
            }),
        }
    }

    /// Insert a bare point with no target.
    pub fn insert(&mut self, p: Option<f64>) -> Result<(), HistogramError> {
        self.latch_target_kind(TargetKind::None)?;
        self.insert_with_target(p, Target::None)
    }

    /// Insert a point with a numeric target.
    pub fn insert_numeric(&mut self, p: Option<f64>, v: Option<f64>) -> Result<(), HistogramError> {
        self.latch_target_kind(TargetKind::Numeric)?;
        self.insert_with_target(p, Target::numeric_of(v))
    }

    /// Insert a point with a categorical target. If `categories` was
    /// declared at creation the target is array-backed (closed vocabulary,
    /// `v` must be one of the declared categories); otherwise it is an
    /// open-vocabulary map.
    pub fn insert_categorical(
        &mut self,
        p: Option<f64>,
        v: Option<String>,
    ) -> Result<(), HistogramError> {
        if let Some(categories) = self.categories.clone() {
            self.latch_target_kind(TargetKind::CategoricalArray)?;
            let target = Target::categorical_array_of(&categories, v.as_deref())?;
            self.insert_with_target(p, target)
        } else {
            self.latch_target_kind(TargetKind::CategoricalMap)?;
            self.insert_with_target(p, Target::categorical_map_of(v))
        }
    }

    /// Insert a point with a fixed-arity tuple of targets. The arity and
    /// per-slot kinds are latched (from `group_types` if declared at
    /// creation, else from the first call) and enforced on every
    /// subsequent call.
    pub fn insert_group(&mut self, p: Option<f64>, vs: Vec<GroupValue>) -> Result<(), HistogramError> {
        if vs.is_empty() {
            return Err(HistogramError::TypeMismatch {
                expected: TargetKind::Group(Vec::new()),
                found: TargetKind::None,
            });
        }
        let observed: Vec<GroupChildKind> = vs.iter().map(GroupValue::kind).collect();
        match &self.group_types {
            Some(declared) if *declared != observed => {
                return Err(HistogramError::TypeMismatch {
                    expected: TargetKind::Group(declared.iter().map(|k| (*k).into()).collect()),
                    found: TargetKind::Group(observed.iter().map(|k| (*k).into()).collect()),
                });
            }
            Some(_) => {}
            None => self.group_types = Some(observed.clone()),
        }
        self.latch_target_kind(TargetKind::Group(
            observed.iter().map(|k| (*k).into()).collect(),
        ))?;
        self.insert_with_target(p, Target::group_of(vs))
    }

    /// Insert an externally constructed bin (count and target already
    /// formed) directly into the reservoir.
    pub fn insert_bin(&mut self, bin: Bin) -> Result<(), HistogramError> {
        self.latch_target_kind(bin.target.kind())?;
        self.adopt_or_check_categories(&bin.target)?;
        self.insert_bin_internal(bin)
    }

    fn adopt_or_check_categories(&mut self, target: &Target) -> Result<(), HistogramError> {
        if let Target::CategoricalArray { categories, .. } = target {
            match &self.categories {
                None => self.categories = Some(categories.clone()),
                Some(mine) if mine == categories => {}
                Some(_) => {
                    return Err(HistogramError::TypeMismatch {
                        expected: TargetKind::CategoricalArray,
                        found: TargetKind::CategoricalArray,
                    })
                }
            }
        }
        Ok(())
    }

    fn insert_with_target(&mut self, p: Option<f64>, target: Target) -> Result<(), HistogramError> {
        match p {
            None => {
                match &mut self.missing_target {
                    Some(mt) => mt.sum(&target)?,
                    None => self.missing_target = Some(target),
                }
                self.missing_count += 1.0;
                self.total_count += 1.0;
                Ok(())
            }
            Some(p) => {
                let mean = canonical_mean(p);
                self.insert_bin_internal(Bin::new(mean, 1.0, target))
            }
        }
    }

    /// The common insertion algorithm shared by point inserts and
    /// `insert_bin`: bookkeeping, freeze-mode routing, exact-hit
    /// accumulation, new-bin insertion, and merge-down (��4.1 steps 2-6).
    fn insert_bin_internal(&mut self, bin: Bin) -> Result<(), HistogramError> {
        self.minimum = Some(self.minimum.map_or(bin.mean, |m| m.min(bin.mean)));
        self.maximum = Some(self.maximum.map_or(bin.mean, |m| m.max(bin.mean)));
        self.total_count += bin.count;

        if let Some(threshold) = self.freeze_threshold {
            if self.total_count > threshold && self.reservoir.len() >= self.max_bins {
                if let Some(target_mean) = self.freeze_route(bin.mean) {
                    tracing::trace!(
                        mean = bin.mean,
                        target_mean,
                        "freeze mode: routing insert to nearest existing bin"
                    );
                    let mut target_bin = self
                        .reservoir
                        .remove(target_mean)
                        .expect("freeze_route returns an existing bin's mean");
                    target_bin.absorb(&bin)?;
                    self.reservoir.replace(target_bin);
                    return Ok(());
                }
            }
        }

        if self.reservoir.get(bin.mean).is_some() {
            let mut existing = self
                .reservoir
                .remove(bin.mean)
                .expect("just confirmed this mean is present");
            existing.accumulate(&bin)?;
            self.reservoir.replace(existing);
            return Ok(());
        }

        self.reservoir.insert_new(bin);
        self.merge_down()?;
        Ok(())
    }

    /// Choose the existing bin with the smallest absolute mean-distance to
    /// `mean`, ties broken toward the floor (��4.1 step 3).
    fn freeze_route(&self, mean: f64) -> Option<f64> {
        let floor = self.reservoir.floor(mean).map(|b| b.mean);
        let ceil = self.reservoir.ceil(mean).map(|b| b.mean);
        match (floor, ceil) {
            (Some(f), Some(c)) => {
                if (mean - f).abs() <= (c - mean).abs() {
                    Some(f)
                } else {
                    Some(c)
                }
            }
            (Some(f), None) => Some(f),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        }
    }

    fn merge_down(&mut self) -> Result<(), HistogramError> {
        while self.reservoir.len() > self.max_bins {
            let (left_mean, right_mean) = self
                .reservoir
                .pop_min_gap()
                .expect("more bins than capacity implies at least one gap");
            let left = self
                .reservoir
                .get(left_mean)
                .expect("gap endpoint is a live bin")
                .clone();
            let right = self
                .reservoir
                .get(right_mean)
                .expect("gap endpoint is a live bin")
                .clone();
            let merged = Bin::combine(&left, &right)?;
            tracing::trace!(
                left_mean,
                right_mean,
                merged_mean = merged.mean,
                merged_count = merged.count,
                "merging adjacent bins to respect capacity"
            );
            self.reservoir.replace_pair_with(left_mean, right_mean, merged);
        }
        Ok(())
    }

    // ---- merge -----------------------------------------------------------

    /// Absorb `other`'s bins into `self`. `self` and `other` must be
    /// compatible: either both empty, or their target kinds match (and, for
    /// array-backed categorical, their category lists match or `self` is
    /// still empty and adopts `other`'s list).
    pub fn merge(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        if other.reservoir.is_empty() && other.missing_count == 0.0 {
            return Ok(());
        }

        if let Some(other_kind) = &other.target_kind {
            match &self.target_kind {
                None => self.target_kind = Some(other_kind.clone()),
                Some(mine) if mine == other_kind => {}
                Some(mine) => {
                    return Err(HistogramError::TypeMismatch {
                        expected: mine.clone(),
                        found: other_kind.clone(),
                    })
                }
            }
        }

        if let Some(other_categories) = &other.categories {
            match &self.categories {
                None => self.categories = Some(other_categories.clone()),
                Some(mine) if mine == other_categories => {}
                Some(_) if self.reservoir.is_empty() => {
                    self.categories = Some(other_categories.clone())
                }
                Some(_) => {
                    return Err(HistogramError::TypeMismatch {
                        expected: TargetKind::CategoricalArray,
                        found: TargetKind::CategoricalArray,
                    })
                }
            }
        }

        if self.group_types.is_none() {
            self.group_types = other.group_types.clone();
        }

        tracing::debug!(
            other_total = other.total_count,
            self_bins = self.reservoir.len(),
            "merging histogram"
        );

        for bin in other.reservoir.iter() {
            self.insert_bin_internal(bin.clone())?;
        }

        self.minimum = match (self.minimum, other.minimum) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, None) => a,
            (None, b) => b,
        };
        self.maximum = match (self.maximum, other.maximum) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        };

        if let Some(other_missing) = &other.missing_target {
            match &mut self.missing_target {
                Some(mt) => mt.sum(other_missing)?,
                None => self.missing_target = Some(other_missing.clone()),
            }
        }
        self.missing_count += other.missing_count;

        self.total_count = self.reservoir.iter().map(|b| b.count).sum::<f64>() + self.missing_count;

        tracing::debug!(
            self_bins = self.reservoir.len(),
            self_total = self.total_count,
            "merge complete"
        );
        Ok(())
    }

    /// Restore a single bin from a deserialized wire form directly into the
    /// reservoir, bypassing freeze-mode routing and merge-down. The wire
    /// form is assumed to already respect capacity and ordering, since it
    /// was produced by a valid histogram in the first place.
    pub(crate) fn restore_bin(&mut self, bin: Bin) {
        self.minimum = Some(self.minimum.map_or(bin.mean, |m| m.min(bin.mean)));
        self.maximum = Some(self.maximum.map_or(bin.mean, |m| m.max(bin.mean)));
        self.total_count += bin.count;
        self.reservoir.insert_new(bin);
    }

    /// Restore the missing-value aggregate from a deserialized wire form.
    /// Unlike [`Histogram::insert`]'s `None`-position path, the count need
    /// not be `1.0`: the wire form stores the aggregated count directly.
    pub(crate) fn restore_missing(&mut self, count: f64, target: Target) -> Result<(), HistogramError> {
        match &mut self.missing_target {
            Some(mt) => mt.sum(&target)?,
            None => self.missing_target = Some(target),
        }
        self.missing_count += count;
        self.total_count += count;
        Ok(())
    }

    /// Overwrite the observed `[minimum, maximum]` with values restored from
    /// a wire form, which may extend past every live bin's mean under
    /// freeze-mode drift.
    pub(crate) fn set_observed_range(&mut self, minimum: Option<f64>, maximum: Option<f64>) {
        if minimum.is_some() {
            self.minimum = minimum;
        }
        if maximum.is_some() {
            self.maximum = maximum;
        }
    }

    pub(crate) fn scale_counts(&mut self, factor: f64) {
        let means: Vec<f64> = self.reservoir.iter().map(|b| b.mean).collect();
        for mean in means {
            if let Some(bin) = self.reservoir.get_mut(mean) {
                bin.count *= factor;
                bin.target.scale(factor);
            }
        }
        self.missing_count *= factor;
        if let Some(mt) = &mut self.missing_target {
            mt.scale(factor);
        }
        self.total_count = self.reservoir.iter().map(|b| b.count).sum::<f64>() + self.missing_count;
    }

    // ---- queries -----------------------------------------------------------

    /// Approximate count of points `<= p`.
    pub fn sum(&self, p: f64) -> Result<f64, HistogramError> {
        self.extended_sum(p).map(|(count, _)| count)
    }

    /// Approximate count and target-sum of points `<= p` (Ben-Haim ��2.2,
    /// with Tyree's target extension).
    pub fn extended_sum(&self, p: f64) -> Result<(f64, Target), HistogramError> {
        if self.reservoir.is_empty() {
            return Err(HistogramError::Empty);
        }
        let min = self.minimum.expect("non-empty histogram has a minimum");
        let max = self.maximum.expect("non-empty histogram has a maximum");

        if p < min {
            return Ok((0.0, self.empty_target_template()));
        }
        if p >= max {
            return Ok((self.total_count, self.total_target_sum()));
        }

        let last = self.reservoir.last().expect("non-empty").clone();
        if p == last.mean {
            // only reachable here because p < max, so last.mean < max strictly.
            let mut half = last.target.clone();
            half.scale(-0.5);
            let mut target = self.total_target_sum();
            target.sum(&half)?;
            return Ok((self.total_count - last.count / 2.0, target));
        }

        let mut preceding_count = 0.0;
        let mut preceding_target = self.empty_target_template();
        let mut left: Option<(f64, f64, Target)> = None;
        let mut right: Option<(f64, f64, Target)> = None;
        for bin in self.reservoir.iter() {
            if bin.mean <= p {
                if let Some((_, lc, lt)) = left.take() {
                    preceding_count += lc;
                    preceding_target.sum(&lt)?;
                }
                left = Some((bin.mean, bin.count, bin.target.clone()));
            } else {
                right = Some((bin.mean, bin.count, bin.target.clone()));
                break;
            }
        }
        let (left_mean, left_count, left_target) =
            left.unwrap_or_else(|| (min, 0.0, self.empty_target_template()));
        let (right_mean, right_count, right_target) =
            right.unwrap_or_else(|| (max, 0.0, self.empty_target_template()));

        let r = (p - left_mean) / (right_mean - left_mean);
        let w_left = 0.5 + r - r * r / 2.0;
        let w_right = r * r / 2.0;

        let count = preceding_count + w_left * left_count + w_right * right_count;

        let mut target = preceding_target;
        let mut lt = left_target;
        lt.scale(w_left);
        target.sum(&lt)?;
        let mut rt = right_target;
        rt.scale(w_right);
        target.sum(&rt)?;

        Ok((count, target))
    }

    /// Pointwise density estimate. Never fails; returns `0.0` outside
    /// `[minimum, maximum]` or on an empty histogram.
    pub fn density(&self, p: f64) -> f64 {
        self.extended_density(p).0
    }

    /// Pointwise density estimate together with the target density.
    pub fn extended_density(&self, p: f64) -> (f64, Target) {
        if self.reservoir.is_empty() {
            return (0.0, Target::None);
        }
        let min = self.minimum.expect("non-empty");
        let max = self.maximum.expect("non-empty");
        if p < min || p > max {
            return (0.0, self.empty_target_template());
        }
        if self.reservoir.get(p).is_some() {
            let (d_before, t_before) = self.density_strict(next_down(p));
            let (d_after, t_after) = self.density_strict(next_up(p));
            let mut target = t_before;
            target.scale(0.5);
            let mut t_after = t_after;
            t_after.scale(0.5);
            let _ = target.sum(&t_after);
            return ((d_before + d_after) / 2.0, target);
        }
        self.density_strict(p)
    }

    /// Density at a point not exactly on a bin mean.
    fn density_strict(&self, p: f64) -> (f64, Target) {
        let min = match self.minimum {
            Some(m) => m,
            None => return (0.0, Target::None),
        };
        let max = self.maximum.expect("minimum implies maximum");
        if p < min || p > max {
            return (0.0, self.empty_target_template());
        }

        let mut left: Option<&Bin> = None;
        let mut right: Option<&Bin> = None;
        for bin in self.reservoir.iter() {
            if bin.mean <= p {
                left = Some(bin);
            } else {
                right = Some(bin);
                break;
            }
        }
        let (left_mean, left_count, left_target) = match left {
            Some(b) => (b.mean, b.count, b.target.clone()),
            None => (min, 0.0, self.empty_target_template()),
        };
        let (right_mean, right_count, right_target) = match right {
            Some(b) => (b.mean, b.count, b.target.clone()),
            None => (max, 0.0, self.empty_target_template()),
        };

        if right_mean == left_mean {
            return (0.0, self.empty_target_template());
        }
        let width = right_mean - left_mean;
        let r = (p - left_mean) / width;
        let count_density = (left_count + r * (right_count - left_count)) / width;

        let mut target = left_target;
        target.scale((1.0 - r) / width);
        let mut rt = right_target;
        rt.scale(r / width);
        let _ = target.sum(&rt);

        (count_density, target)
    }

    /// The expected target value given `X == p`, or `None` where the count
    /// density is zero (outside the support, or an isolated point with no
    /// neighbours).
    pub fn average_target(&self, p: f64) -> Option<Target> {
        let (count_density, mut target_density) = self.extended_density(p);
        if count_density == 0.0 {
            return None;
        }
        target_density.scale(1.0 / count_density);
        Some(target_density)
    }

    /// Cumulative sum value at each bin mean, precomputed once per query
    /// batch as the `bin_sum_map` of ��4.1.
    fn bin_sum_anchors(&self) -> Vec<(f64, f64, f64)> {
        let n = self.reservoir.len();
        let mut anchors = Vec::with_capacity(n);
        let mut prefix = 0.0;
        for (idx, bin) in self.reservoir.iter().enumerate() {
            let s = if idx + 1 == n {
                self.total_count - bin.count / 2.0
            } else {
                prefix + bin.count / 2.0
            };
            anchors.push((bin.mean, s, bin.count));
            prefix += bin.count;
        }
        anchors
    }

    /// Locate the point `x` such that `sum(x) == s`, by inverting the
    /// cumulative-sum interpolation.
    fn locate(&self, s: f64) -> f64 {
        let min = self.minimum.expect("non-empty");
        let max = self.maximum.expect("non-empty");
        if s <= 0.0 {
            return min;
        }
        if s >= self.total_count {
            return max;
        }
        let anchors = self.bin_sum_anchors();
        let mut prev = (min, 0.0, 0.0);
        for &(mean, bsum, count) in &anchors {
            if bsum >= s {
                return Self::interpolate_position(prev, (mean, bsum, count), s);
            }
            prev = (mean, bsum, count);
        }
        Self::interpolate_position(prev, (max, self.total_count, 0.0), s)
    }

    fn interpolate_position(left: (f64, f64, f64), right: (f64, f64, f64), s: f64) -> f64 {
        let (p_i, s_i, m_i) = left;
        let (p_next, _s_next, m_next) = right;
        let a = m_next - m_i;
        let d = s - s_i;
        let z = if a == 0.0 {
            let denom = (m_i + m_next) / 2.0;
            if denom == 0.0 {
                0.0
            } else {
                d / denom
            }
        } else {
            let b = 2.0 * m_i;
            let c = -2.0 * d;
            solve_unit_quadratic(a, b, c)
        };
        p_i + z * (p_next - p_i)
    }

    /// `k - 1` split points partitioning the total weight into `k`
    /// approximately-equal parts. The requested granularity is floored at
    /// `max(first_bin.count, last_bin.count) / 2` per point (��4.1).
    pub fn uniform(&self, k: usize) -> Vec<f64> {
        if self.reservoir.is_empty() || k <= 1 {
            return Vec::new();
        }
        let total = self.total_count;
        let first_count = self.reservoir.first().expect("non-empty").count;
        let last_count = self.reservoir.last().expect("non-empty").count;
        let floor_step = first_count.max(last_count) / 2.0;

        let mut k = k;
        if floor_step > 0.0 {
            let requested_step = total / k as f64;
            if requested_step < floor_step {
                k = ((total / floor_step).floor() as usize).max(1);
            }
        }
        if k <= 1 {
            return Vec::new();
        }
        (1..k).map(|i| self.locate(i as f64 * total / k as f64)).collect()
    }

    /// Map each requested quantile `q` (in `[0, 1]`) to its approximate
    /// position.
    pub fn percentiles(&self, qs: &[f64]) -> Vec<(f64, f64)> {
        if self.reservoir.is_empty() {
            return Vec::new();
        }
        qs.iter()
            .map(|&q| (q, self.locate(q * self.total_count)))
            .collect()
    }
}

fn solve_unit_quadratic(a: f64, b: f64, c: f64) -> f64 {
    let disc = (b * b - 4.0 * a * c).max(0.0);
    let z = (-b + disc.sqrt()) / (2.0 * a);
    z.clamp(0.0, 1.0)
}

/// The next representable `f64` toward positive infinity.
fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    let bits = x.to_bits();
    let next_bits = if x == 0.0 {
        1u64
    } else if x.is_sign_positive() {
        bits + 1
    } else {
        bits - 1
    };
    f64::from_bits(next_bits)
}

/// The next representable `f64` toward negative infinity.
fn next_down(x: f64) -> f64 {
    -next_up(-x)
}
