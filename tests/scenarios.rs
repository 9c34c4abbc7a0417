//! Literal scenario tests from the engine's testable-properties list: fixed
//! inputs (or seeded random streams) with known expected outputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use streamhist::{Histogram, HistogramOptions, Target};

fn uniform_histogram(bins: usize, gap_weighted: bool) -> Histogram {
    Histogram::create(HistogramOptions {
        bins,
        gap_weighted,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn s1_uniform_sum() {
    let mut h = uniform_histogram(100, false);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..100_000 {
        let x: f64 = rng.random();
        h.insert(Some(x)).unwrap();
    }
    let s = h.sum(0.5).unwrap();
    assert!(
        (49_500.0..=50_500.0).contains(&s),
        "sum(0.5) = {s}, expected within [49500, 50500]"
    );
}

#[test]
fn s2_gaussian_median() {
    let mut h = uniform_histogram(100, false);
    let mut rng = StdRng::seed_from_u64(2);
    let normal = Normal::new(0.0_f64, 1.0_f64).unwrap();
    for _ in 0..100_000 {
        h.insert(Some(normal.sample(&mut rng))).unwrap();
    }
    let median = h.uniform(2)[0];
    assert!(median.abs() < 0.01, "median = {median}, expected within (-0.01, 0.01)");
}

#[test]
fn s3_integer_density() {
    let mut h = uniform_histogram(64, false);
    for x in [1.0, 2.0, 2.0, 3.0] {
        h.insert(Some(x)).unwrap();
    }
    let points = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0];
    let expected = [0.0, 0.0, 0.5, 1.5, 2.0, 1.5, 0.5, 0.0, 0.0];
    for (p, e) in points.iter().zip(expected.iter()) {
        let d = h.density(*p);
        assert!((d - e).abs() < 1e-10, "density({p}) = {d}, expected {e}");
    }
}

#[test]
fn s4_bin_merging_under_capacity() {
    let mut h = uniform_histogram(3, false);
    for x in [1.0, 2.0, 3.0, 0.5] {
        h.insert(Some(x)).unwrap();
    }
    let bins = h.bins();
    assert_eq!(bins.len(), 3);
    let means: Vec<f64> = bins.iter().map(|b| b.mean).collect();
    let counts: Vec<f64> = bins.iter().map(|b| b.count).collect();
    assert!((means[0] - 0.75).abs() < 1e-9, "means = {means:?}");
    assert_eq!(counts[0], 2.0);
    assert!((means[1] - 2.0).abs() < 1e-9);
    assert_eq!(counts[1], 1.0);
    assert!((means[2] - 3.0).abs() < 1e-9);
    assert_eq!(counts[2], 1.0);
}

#[test]
fn s5_categorical_with_missing() {
    let mut h = Histogram::create(HistogramOptions {
        bins: 2,
        categories: Some(vec!["foo".to_string(), "bar".to_string()]),
        ..Default::default()
    })
    .unwrap();

    h.insert_categorical(Some(1.0), Some("foo".to_string())).unwrap();
    h.insert_categorical(Some(1.0), None).unwrap();
    h.insert_categorical(Some(4.0), Some("bar".to_string())).unwrap();
    h.insert_categorical(Some(6.0), None).unwrap();

    let bins = h.bins();
    assert_eq!(bins.len(), 2);

    assert!((bins[0].mean - 1.0).abs() < 1e-9);
    assert_eq!(bins[0].count, 2.0);
    match &bins[0].target {
        Target::CategoricalArray { categories, counts, missing_count } => {
            assert_eq!(categories, &vec!["foo".to_string(), "bar".to_string()]);
            assert_eq!(counts, &vec![1.0, 0.0]);
            assert_eq!(*missing_count, 1.0);
        }
        other => panic!("expected array-backed categorical, got {other:?}"),
    }

    assert!((bins[1].mean - 5.0).abs() < 1e-9);
    assert_eq!(bins[1].count, 2.0);
    match &bins[1].target {
        Target::CategoricalArray { counts, missing_count, .. } => {
            assert_eq!(counts, &vec![0.0, 1.0]);
            assert_eq!(*missing_count, 1.0);
        }
        other => panic!("expected array-backed categorical, got {other:?}"),
    }
}

#[test]
fn s6_gap_weighted_favors_tails() {
    let mut rng = StdRng::seed_from_u64(6);
    let normal = Normal::new(0.0_f64, 1.0_f64).unwrap();
    let samples: Vec<f64> = (0..10_000).map(|_| normal.sample(&mut rng)).collect();

    let mut classic = uniform_histogram(32, false);
    let mut weighted = uniform_histogram(32, true);
    for &x in &samples {
        classic.insert(Some(x)).unwrap();
        weighted.insert(Some(x)).unwrap();
    }

    let tail_count = |h: &Histogram| -> f64 {
        let bins = h.bins();
        bins.first().unwrap().count + bins.last().unwrap().count
    };

    assert!(
        tail_count(&weighted) > tail_count(&classic),
        "weighted tail count {} should exceed classic tail count {}",
        tail_count(&weighted),
        tail_count(&classic)
    );
}

#[test]
fn s7_merge_conservation() {
    let mut rng = StdRng::seed_from_u64(7);
    let normal = Normal::new(0.0_f64, 1.0_f64).unwrap();

    let mut merged = uniform_histogram(64, false);
    for _ in 0..10 {
        let mut part = uniform_histogram(64, false);
        for _ in 0..1_000 {
            part.insert(Some(normal.sample(&mut rng))).unwrap();
        }
        merged.merge(&part).unwrap();
    }

    assert_eq!(merged.total_count(), 10_000.0);
    let s = merged.sum(0.0).unwrap();
    assert!((s - 5_000.0).abs() < 500.0, "sum(0) = {s}, expected near 5000");
}
