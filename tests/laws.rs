//! Invariant and law tests (I1-I5, L1-L7) exercised end-to-end through the
//! public API, using seeded pseudo-random streams so runs are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use streamhist::{Bin, Histogram, HistogramError, HistogramOptions, Target, TargetKind};

fn gaussian_histogram(bins: usize, seed: u64, n: usize) -> Histogram {
    let mut h = Histogram::with_bins(bins);
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0_f64, 1.0_f64).unwrap();
    for _ in 0..n {
        h.insert(Some(normal.sample(&mut rng))).unwrap();
    }
    h
}

// ---- invariants ------------------------------------------------------------

#[test]
fn i1_means_strictly_increasing() {
    let h = gaussian_histogram(40, 10, 5_000);
    let bins = h.bins();
    for w in bins.windows(2) {
        assert!(w[0].mean < w[1].mean, "means not strictly increasing: {:?}", bins);
    }
}

#[test]
fn i2_bin_count_never_exceeds_capacity() {
    let h = gaussian_histogram(40, 11, 5_000);
    assert!(h.len() <= h.max_bins());
    assert!(h.len() <= 40);
}

#[test]
fn i3_counts_conserve_total() {
    let h = gaussian_histogram(40, 12, 5_000);
    let bin_total: f64 = h.bins().iter().map(|b| b.count).sum();
    assert!((bin_total + h.missing_count() - h.total_count()).abs() < 1e-6);
}

#[test]
fn i5_target_kind_latched_on_first_insert() {
    let mut h = Histogram::with_bins(8);
    h.insert(Some(1.0)).unwrap();
    assert_eq!(h.target_kind(), Some(&TargetKind::None));
    let err = h.insert_numeric(Some(2.0), Some(3.0)).unwrap_err();
    assert_eq!(
        err,
        HistogramError::TypeMismatch {
            expected: TargetKind::None,
            found: TargetKind::Numeric,
        }
    );
}

// ---- laws ------------------------------------------------------------------

#[test]
fn l1_round_trip_preserves_queries() {
    let h = gaussian_histogram(50, 20, 20_000);
    let json = serde_json::to_string(&h).unwrap();
    let restored: Histogram = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.bins().len(), h.bins().len());
    for (a, b) in h.bins().iter().zip(restored.bins().iter()) {
        assert!((a.mean - b.mean).abs() < 1e-9);
        assert!((a.count - b.count).abs() < 1e-9);
    }
    assert_eq!(h.minimum(), restored.minimum());
    assert_eq!(h.maximum(), restored.maximum());
    assert_eq!(h.missing_bin().is_some(), restored.missing_bin().is_some());

    for p in [-3.0, -1.0, -0.1, 0.0, 0.1, 1.0, 3.0] {
        let a = h.sum(p).unwrap();
        let b = restored.sum(p).unwrap();
        assert!((a - b).abs() < 1e-9, "sum({p}) diverged after round-trip: {a} vs {b}");
        assert!((h.density(p) - restored.density(p)).abs() < 1e-9);
    }
    for (q_a, (_, p_a)) in h.percentiles(&[0.1, 0.5, 0.9]).into_iter().enumerate() {
        let (_, p_b) = restored.percentiles(&[0.1, 0.5, 0.9])[q_a];
        assert!((p_a - p_b).abs() < 1e-9);
    }
}

#[test]
fn l1_round_trip_with_categorical_and_missing() {
    let mut h = Histogram::create(HistogramOptions {
        bins: 4,
        categories: Some(vec!["a".to_string(), "b".to_string()]),
        ..Default::default()
    })
    .unwrap();
    h.insert_categorical(Some(1.0), Some("a".to_string())).unwrap();
    h.insert_categorical(None, Some("b".to_string())).unwrap();
    h.insert_categorical(Some(2.0), None).unwrap();

    let json = serde_json::to_string(&h).unwrap();
    let restored: Histogram = serde_json::from_str(&json).unwrap();
    assert_eq!(h.bins(), restored.bins());
    assert_eq!(h.missing_bin(), restored.missing_bin());
}

#[test]
fn l2_merge_identity() {
    let h = gaussian_histogram(30, 30, 2_000);
    let empty = Histogram::with_bins(30);

    let mut lhs = h.clone();
    lhs.merge(&empty).unwrap();
    assert_eq!(lhs.bins(), h.bins());
    assert_eq!(lhs.total_count(), h.total_count());

    let mut rhs = Histogram::with_bins(30);
    rhs.merge(&h).unwrap();
    assert_eq!(rhs.total_count(), h.total_count());
    let rhs_total: f64 = rhs.bins().iter().map(|b| b.count).sum();
    let h_total: f64 = h.bins().iter().map(|b| b.count).sum();
    assert!((rhs_total - h_total).abs() < 1e-9);
}

#[test]
fn l3_merge_conserves_total_count() {
    let a = gaussian_histogram(25, 31, 3_000);
    let b = gaussian_histogram(25, 32, 4_000);
    let mut merged = a.clone();
    merged.merge(&b).unwrap();
    assert!((merged.total_count() - (a.total_count() + b.total_count())).abs() < 1e-6);
}

#[test]
fn l4_sum_is_monotone() {
    let h = gaussian_histogram(40, 40, 10_000);
    let grid: Vec<f64> = (-200..=200).map(|i| i as f64 / 40.0).collect();
    let mut previous = h.sum(grid[0]).unwrap();
    for &p in &grid[1..] {
        let s = h.sum(p).unwrap();
        assert!(s + 1e-9 >= previous, "sum not monotone at {p}: {s} < {previous}");
        previous = s;
    }
}

#[test]
fn l5_range_clamp() {
    let h = gaussian_histogram(40, 41, 10_000);
    let min = h.minimum().unwrap();
    let max = h.maximum().unwrap();
    assert_eq!(h.sum(min).unwrap(), 0.0);
    assert!((h.sum(max).unwrap() - h.total_count()).abs() < 1e-9);
}

#[test]
fn l6_sum_difference_matches_integrated_density() {
    let h = gaussian_histogram(40, 42, 10_000);
    let p1 = -1.0;
    let p2 = 1.0;
    let direct = h.sum(p2).unwrap() - h.sum(p1).unwrap();

    let steps = 2_000;
    let width = (p2 - p1) / steps as f64;
    let mut integral = 0.0;
    for i in 0..steps {
        let mid = p1 + width * (i as f64 + 0.5);
        integral += h.density(mid) * width;
    }
    let tolerance = (direct.abs() * 0.01).max(1.0);
    assert!(
        (direct - integral).abs() < tolerance,
        "sum difference {direct} vs integrated density {integral}"
    );
}

#[test]
fn l7_bin_reinsertion_is_idempotent() {
    let h = gaussian_histogram(30, 43, 5_000);
    let mut rebuilt = Histogram::with_bins(30);
    for bin in h.bins() {
        rebuilt.insert_bin(bin).unwrap();
    }
    assert_eq!(rebuilt.bins().len(), h.bins().len());
    for (a, b) in h.bins().iter().zip(rebuilt.bins().iter()) {
        assert!((a.mean - b.mean).abs() < 1e-9);
        assert!((a.count - b.count).abs() < 1e-9);
    }
}

#[test]
fn l7_single_bin_reinsertion_preserves_target() {
    let mut h = Histogram::with_bins(16);
    h.insert_numeric(Some(1.0), Some(10.0)).unwrap();
    h.insert_numeric(Some(1.0), Some(20.0)).unwrap();

    let mut rebuilt = Histogram::with_bins(16);
    for bin in h.bins() {
        rebuilt.insert_bin(bin).unwrap();
    }
    let a: Vec<Bin> = h.bins();
    let b: Vec<Bin> = rebuilt.bins();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    match (&a[0].target, &b[0].target) {
        (Target::Numeric { sum: s1, .. }, Target::Numeric { sum: s2, .. }) => {
            assert_eq!(s1, s2);
        }
        other => panic!("expected numeric targets, got {other:?}"),
    }
}
