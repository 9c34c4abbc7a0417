//! Component A: the polymorphic per-bin summary ("target") and its algebra.
//!
//! A [`Target`] is a tagged variant rather than a trait object so that the
//! arithmetic in [`crate::bin`] and [`crate::histogram`] monomorphises on the
//! concrete shape latched into a histogram at creation/first-insert time,
//! instead of paying for virtual dispatch on every bin touched.

use std::collections::BTreeMap;

use crate::error::HistogramError;
use crate::histogram::Histogram;

/// The shape of target a histogram has latched, without the payload.
///
/// Two histograms (or a bin and a histogram) are only ever combined when
/// their `TargetKind`s match; `Group` additionally requires the child kinds
/// to match element-wise, and array-backed `CategoricalArray` additionally
/// requires equal category lists (checked separately, since the list itself
/// is not part of the kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    None,
    Numeric,
    CategoricalMap,
    CategoricalArray,
    Group(Vec<TargetKind>),
    NestedHistogram,
}

/// One slot's declared kind inside a `group_types` creation option. Distinct
/// from [`TargetKind`] because a group slot only ever declares `none`,
/// `numeric`, or `categorical` (open-vocabulary map form) -- arrays and
/// nested groups/histograms are not valid group children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChildKind {
    None,
    Numeric,
    Categorical,
}

impl From<GroupChildKind> for TargetKind {
    fn from(k: GroupChildKind) -> Self {
        match k {
            GroupChildKind::None => TargetKind::None,
            GroupChildKind::Numeric => TargetKind::Numeric,
            GroupChildKind::Categorical => TargetKind::CategoricalMap,
        }
    }
}

/// A value supplied by a caller for one slot of a [`Histogram::insert_group`]
/// call. Mirrors [`GroupChildKind`] but carries the actual observation (or
/// its absence).
#[derive(Debug, Clone)]
pub enum GroupValue {
    None,
    Numeric(Option<f64>),
    Categorical(Option<String>),
}

impl GroupValue {
    pub fn kind(&self) -> GroupChildKind {
        match self {
            GroupValue::None => GroupChildKind::None,
            GroupValue::Numeric(_) => GroupChildKind::Numeric,
            GroupValue::Categorical(_) => GroupChildKind::Categorical,
        }
    }

    fn into_target(self) -> Target {
        match self {
            GroupValue::None => Target::None,
            GroupValue::Numeric(v) => Target::numeric_of(v),
            GroupValue::Categorical(v) => Target::categorical_map_of(v),
        }
    }
}

/// The per-bin summary of an auxiliary variable.
///
/// Every variant implements the same small algebra: `init_like` (an empty
/// summary of the same shape), `sum` (in-place addition, used both to merge
/// two bins and to accumulate a running total across many bins), and
/// `scale` (in-place multiplication of every stored aggregate, used by the
/// fractional-weight terms in the `sum`/`density` interpolation).
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    None,
    Numeric {
        sum: f64,
        sum_squares: f64,
        missing_count: f64,
    },
    CategoricalMap {
        counts: BTreeMap<String, f64>,
        missing_count: f64,
    },
    CategoricalArray {
        categories: Vec<String>,
        counts: Vec<f64>,
        missing_count: f64,
    },
    Group {
        children: Vec<Target>,
    },
    NestedHistogram {
        hist: Box<Histogram>,
    },
}

impl Target {
    pub fn numeric_of(v: Option<f64>) -> Target {
        match v {
            Some(v) => Target::Numeric {
                sum: v,
                sum_squares: v * v,
                missing_count: 0.0,
            },
            None => Target::Numeric {
                sum: 0.0,
                sum_squares: 0.0,
                missing_count: 1.0,
            },
        }
    }

    pub fn categorical_map_of(v: Option<String>) -> Target {
        let mut counts = BTreeMap::new();
        let missing_count = match v {
            Some(category) => {
                counts.insert(category, 1.0);
                0.0
            }
            None => 1.0,
        };
        Target::CategoricalMap {
            counts,
            missing_count,
        }
    }

    pub fn categorical_array_of(categories: &[String], v: Option<&str>) -> Result<Target, HistogramError> {
        let mut counts = vec![0.0; categories.len()];
        let missing_count = match v {
            Some(category) => {
                let idx = categories
                    .iter()
                    .position(|c| c == category)
                    .ok_or_else(|| HistogramError::UnknownCategory {
                        category: category.to_string(),
                        declared: categories.to_vec(),
                    })?;
                counts[idx] = 1.0;
                0.0
            }
            None => 1.0,
        };
        Ok(Target::CategoricalArray {
            categories: categories.to_vec(),
            counts,
            missing_count,
        })
    }

    pub fn group_of(values: Vec<GroupValue>) -> Target {
        Target::Group {
            children: values.into_iter().map(GroupValue::into_target).collect(),
        }
    }

    /// The shape of this target, ignoring payload.
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::None => TargetKind::None,
            Target::Numeric { .. } => TargetKind::Numeric,
            Target::CategoricalMap { .. } => TargetKind::CategoricalMap,
            Target::CategoricalArray { .. } => TargetKind::CategoricalArray,
            Target::Group { children } => {
                TargetKind::Group(children.iter().map(Target::kind).collect())
            }
            Target::NestedHistogram { .. } => TargetKind::NestedHistogram,
        }
    }

    /// An empty target of the same shape as `self` (same category lists,
    /// same group arity/child kinds, an empty nested histogram with the
    /// same `max_bins`).
    pub fn init_like(&self) -> Target {
        match self {
            Target::None => Target::None,
            Target::Numeric { .. } => Target::Numeric {
                sum: 0.0,
                sum_squares: 0.0,
                missing_count: 0.0,
            },
            Target::CategoricalMap { .. } => Target::CategoricalMap {
                counts: BTreeMap::new(),
                missing_count: 0.0,
            },
            Target::CategoricalArray { categories, .. } => Target::CategoricalArray {
                categories: categories.clone(),
                counts: vec![0.0; categories.len()],
                missing_count: 0.0,
            },
            Target::Group { children } => Target::Group {
                children: children.iter().map(Target::init_like).collect(),
            },
            Target::NestedHistogram { hist } => Target::NestedHistogram {
                hist: Box::new(hist.empty_clone()),
            },
        }
    }

    /// Add `other` into `self` in place. Both operands must share a
    /// [`TargetKind`] (and, for `CategoricalArray`, the same category list).
    pub fn sum(&mut self, other: &Target) -> Result<(), HistogramError> {
        match (self, other) {
            (Target::None, Target::None) => Ok(()),
            (
                Target::Numeric {
                    sum,
                    sum_squares,
                    missing_count,
                },
                Target::Numeric {
                    sum: o_sum,
                    sum_squares: o_sum_squares,
                    missing_count: o_missing,
                },
            ) => {
                *sum += o_sum;
                *sum_squares += o_sum_squares;
                *missing_count += o_missing;
                Ok(())
            }
            (
                Target::CategoricalMap {
                    counts,
                    missing_count,
                },
                Target::CategoricalMap {
                    counts: o_counts,
                    missing_count: o_missing,
                },
            ) => {
                for (category, weight) in o_counts {
                    *counts.entry(category.clone()).or_insert(0.0) += weight;
                }
                *missing_count += o_missing;
                Ok(())
            }
            (
                Target::CategoricalArray {
                    categories,
                    counts,
                    missing_count,
                },
                Target::CategoricalArray {
                    categories: o_categories,
                    counts: o_counts,
                    missing_count: o_missing,
                },
            ) => {
                if categories != o_categories {
                    return Err(HistogramError::TypeMismatch {
                        expected: TargetKind::CategoricalArray,
                        found: TargetKind::CategoricalArray,
                    });
                }
                for (c, o) in counts.iter_mut().zip(o_counts.iter()) {
                    *c += o;
                }
                *missing_count += o_missing;
                Ok(())
            }
            (Target::Group { children }, Target::Group { children: o_children }) => {
                if children.len() != o_children.len() {
                    return Err(HistogramError::TypeMismatch {
                        expected: TargetKind::Group(children.iter().map(Target::kind).collect()),
                        found: TargetKind::Group(o_children.iter().map(Target::kind).collect()),
                    });
                }
                for (c, o) in children.iter_mut().zip(o_children.iter()) {
                    c.sum(o)?;
                }
                Ok(())
            }
            (Target::NestedHistogram { hist }, Target::NestedHistogram { hist: o_hist }) => {
                hist.merge(o_hist)
            }
            (lhs, rhs) => Err(HistogramError::TypeMismatch {
                expected: lhs.kind(),
                found: rhs.kind(),
            }),
        }
    }

    /// Multiply every stored aggregate by `factor` in place. Used when a
    /// bin's full target only partially counts toward a sum/density query
    /// (the fractional-weight terms of the Ben-Haim interpolation).
    pub fn scale(&mut self, factor: f64) {
        match self {
            Target::None => {}
            Target::Numeric {
                sum,
                sum_squares,
                missing_count,
            } => {
                *sum *= factor;
                *sum_squares *= factor;
                *missing_count *= factor;
            }
            Target::CategoricalMap {
                counts,
                missing_count,
            } => {
                for weight in counts.values_mut() {
                    *weight *= factor;
                }
                *missing_count *= factor;
            }
            Target::CategoricalArray {
                counts,
                missing_count,
                ..
            } => {
                for c in counts.iter_mut() {
                    *c *= factor;
                }
                *missing_count *= factor;
            }
            Target::Group { children } => {
                for c in children.iter_mut() {
                    c.scale(factor);
                }
            }
            Target::NestedHistogram { hist } => hist.scale_counts(factor),
        }
    }

    /// A zero-valued target of the given shape. Unlike `init_like`, which
    /// copies an existing target's shape, this builds the shape from a
    /// [`TargetKind`] alone, consulting `categories` for the array-backed
    /// categorical case (a bare `TargetKind::CategoricalArray` carries no
    /// category list of its own).
    pub fn blank(kind: &TargetKind, categories: Option<&[String]>) -> Target {
        match kind {
            TargetKind::None => Target::None,
            TargetKind::Numeric => Target::Numeric {
                sum: 0.0,
                sum_squares: 0.0,
                missing_count: 0.0,
            },
            TargetKind::CategoricalMap => Target::CategoricalMap {
                counts: BTreeMap::new(),
                missing_count: 0.0,
            },
            TargetKind::CategoricalArray => {
                let categories = categories.map(|c| c.to_vec()).unwrap_or_default();
                Target::CategoricalArray {
                    counts: vec![0.0; categories.len()],
                    categories,
                    missing_count: 0.0,
                }
            }
            TargetKind::Group(children) => Target::Group {
                children: children.iter().map(|k| Target::blank(k, categories)).collect(),
            },
            TargetKind::NestedHistogram => Target::NestedHistogram {
                hist: Box::new(Histogram::with_bins(64)),
            },
        }
    }

    /// The count of observations folded into this target whose value was
    /// absent (distinct from the histogram-level `missing_count`, which
    /// counts points whose *position* was absent).
    pub fn missing_count(&self) -> f64 {
        match self {
            Target::None => 0.0,
            Target::Numeric { missing_count, .. } => *missing_count,
            Target::CategoricalMap { missing_count, .. } => *missing_count,
            Target::CategoricalArray { missing_count, .. } => *missing_count,
            Target::Group { children } => children.iter().map(Target::missing_count).sum(),
            Target::NestedHistogram { hist } => hist.missing_count(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numeric_sum_accumulates_moments() {
        let mut a = Target::numeric_of(Some(2.0));
        a.sum(&Target::numeric_of(Some(3.0))).unwrap();
        a.sum(&Target::numeric_of(None)).unwrap();
        match a {
            Target::Numeric { sum, sum_squares, missing_count } => {
                assert_eq!(sum, 5.0);
                assert_eq!(sum_squares, 4.0 + 9.0);
                assert_eq!(missing_count, 1.0);
            }
            other => panic!("expected numeric, got {other:?}"),
        }
    }

    #[test]
    fn sum_rejects_mismatched_kinds() {
        let mut a = Target::numeric_of(Some(1.0));
        let b = Target::categorical_map_of(Some("x".to_string()));
        let err = a.sum(&b).unwrap_err();
        assert_eq!(
            err,
            HistogramError::TypeMismatch {
                expected: TargetKind::Numeric,
                found: TargetKind::CategoricalMap,
            }
        );
    }

    #[test]
    fn categorical_array_rejects_unknown_category() {
        let categories = vec!["foo".to_string(), "bar".to_string()];
        let err = Target::categorical_array_of(&categories, Some("baz")).unwrap_err();
        assert_eq!(
            err,
            HistogramError::UnknownCategory {
                category: "baz".to_string(),
                declared: categories,
            }
        );
    }

    #[test]
    fn categorical_array_sum_rejects_different_category_lists() {
        let mut a =
            Target::categorical_array_of(&["a".to_string(), "b".to_string()], Some("a")).unwrap();
        let b = Target::categorical_array_of(&["x".to_string(), "y".to_string()], Some("x")).unwrap();
        assert!(a.sum(&b).is_err());
    }

    #[test]
    fn scale_multiplies_every_aggregate() {
        let mut a = Target::numeric_of(Some(2.0));
        a.scale(2.0);
        assert_eq!(a, Target::Numeric { sum: 4.0, sum_squares: 8.0, missing_count: 0.0 });
    }

    #[test]
    fn group_sum_is_elementwise() {
        let mut a = Target::group_of(vec![
            GroupValue::Numeric(Some(1.0)),
            GroupValue::Categorical(Some("x".to_string())),
        ]);
        let b = Target::group_of(vec![
            GroupValue::Numeric(Some(2.0)),
            GroupValue::Categorical(Some("x".to_string())),
        ]);
        a.sum(&b).unwrap();
        match a {
            Target::Group { children } => {
                match &children[0] {
                    Target::Numeric { sum, .. } => assert_eq!(*sum, 3.0),
                    other => panic!("expected numeric child, got {other:?}"),
                }
                match &children[1] {
                    Target::CategoricalMap { counts, .. } => {
                        assert_eq!(counts.get("x"), Some(&2.0));
                    }
                    other => panic!("expected categorical child, got {other:?}"),
                }
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn blank_builds_zeroed_shape_from_kind() {
        let categories = vec!["a".to_string(), "b".to_string()];
        let blank = Target::blank(&TargetKind::CategoricalArray, Some(&categories));
        assert_eq!(
            blank,
            Target::CategoricalArray {
                categories,
                counts: vec![0.0, 0.0],
                missing_count: 0.0,
            }
        );
    }
}
