//! Component E: the canonical wire form.
//!
//! `Histogram` and `Target` don't derive `Serialize`/`Deserialize` directly;
//! both need context the payload alone doesn't carry (a `Target::CategoricalArray`
//! and a `Target::CategoricalMap` share an identical wire shape, so
//! reconstructing the right variant needs the histogram's declared
//! `target_kind`/`categories`). Instead this module defines a plain-data
//! "wire" mirror of each type and converts to/from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bin::Bin;
use crate::error::HistogramError;
use crate::histogram::{Histogram, HistogramOptions};
use crate::target::{GroupChildKind, Target, TargetKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum GroupChildKindWire {
    None,
    Numeric,
    Categorical,
}

impl From<GroupChildKind> for GroupChildKindWire {
    fn from(k: GroupChildKind) -> Self {
        match k {
            GroupChildKind::None => GroupChildKindWire::None,
            GroupChildKind::Numeric => GroupChildKindWire::Numeric,
            GroupChildKind::Categorical => GroupChildKindWire::Categorical,
        }
    }
}

impl From<GroupChildKindWire> for GroupChildKind {
    fn from(k: GroupChildKindWire) -> Self {
        match k {
            GroupChildKindWire::None => GroupChildKind::None,
            GroupChildKindWire::Numeric => GroupChildKind::Numeric,
            GroupChildKindWire::Categorical => GroupChildKind::Categorical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TargetWire {
    Numeric {
        sum: f64,
        sum_squares: f64,
        missing_count: f64,
    },
    Categorical {
        counts: BTreeMap<String, f64>,
        missing_count: f64,
    },
    Group(Vec<Option<TargetWire>>),
    Nested(HistogramWire),
}

impl Target {
    fn to_wire(&self) -> Option<TargetWire> {
        match self {
            Target::None => None,
            Target::Numeric {
                sum,
                sum_squares,
                missing_count,
            } => Some(TargetWire::Numeric {
                sum: *sum,
                sum_squares: *sum_squares,
                missing_count: *missing_count,
            }),
            Target::CategoricalMap {
                counts,
                missing_count,
            } => Some(TargetWire::Categorical {
                counts: counts.clone(),
                missing_count: *missing_count,
            }),
            Target::CategoricalArray {
                categories,
                counts,
                missing_count,
            } => Some(TargetWire::Categorical {
                counts: categories
                    .iter()
                    .cloned()
                    .zip(counts.iter().copied())
                    .collect(),
                missing_count: *missing_count,
            }),
            Target::Group { children } => {
                Some(TargetWire::Group(children.iter().map(Target::to_wire).collect()))
            }
            Target::NestedHistogram { hist } => {
                Some(TargetWire::Nested(HistogramWire::from_histogram(hist)))
            }
        }
    }

    fn from_wire(
        wire: Option<TargetWire>,
        kind: &TargetKind,
        categories: Option<&[String]>,
    ) -> Result<Target, HistogramError> {
        match (kind, wire) {
            (TargetKind::None, _) => Ok(Target::None),
            (TargetKind::Numeric, Some(TargetWire::Numeric { sum, sum_squares, missing_count })) => {
                Ok(Target::Numeric {
                    sum,
                    sum_squares,
                    missing_count,
                })
            }
            (TargetKind::CategoricalMap, Some(TargetWire::Categorical { counts, missing_count })) => {
                Ok(Target::CategoricalMap {
                    counts,
                    missing_count,
                })
            }
            (TargetKind::CategoricalArray, Some(TargetWire::Categorical { counts, missing_count })) => {
                let declared = categories.unwrap_or(&[]);
                let values = declared
                    .iter()
                    .map(|c| counts.get(c).copied().unwrap_or(0.0))
                    .collect();
                Ok(Target::CategoricalArray {
                    categories: declared.to_vec(),
                    counts: values,
                    missing_count,
                })
            }
            (TargetKind::Group(child_kinds), Some(TargetWire::Group(child_wires))) => {
                if child_kinds.len() != child_wires.len() {
                    return Err(HistogramError::TypeMismatch {
                        expected: kind.clone(),
                        found: TargetKind::Group(Vec::new()),
                    });
                }
                let children = child_kinds
                    .iter()
                    .zip(child_wires)
                    .map(|(k, w)| Target::from_wire(w, k, categories))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Target::Group { children })
            }
            (TargetKind::NestedHistogram, Some(TargetWire::Nested(wire))) => Ok(Target::NestedHistogram {
                hist: Box::new(wire.into_histogram()?),
            }),
            (expected, _) => Err(HistogramError::TypeMismatch {
                expected: expected.clone(),
                found: TargetKind::None,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinWire {
    mean: f64,
    count: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    target: Option<TargetWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MissingBinWire {
    count: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    target: Option<TargetWire>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// The canonical on-wire representation of a [`Histogram`] (��6). Omits the
/// internal `reservoir` knob, which never changes observable behavior
/// (see DESIGN.md) and so is not part of round-trip fidelity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramWire {
    max_bins: usize,
    #[serde(skip_serializing_if = "is_false", default)]
    gap_weighted: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    freeze: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    group_types: Option<Vec<GroupChildKindWire>>,
    bins: Vec<BinWire>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    missing_bin: Option<MissingBinWire>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    maximum: Option<f64>,
}

impl HistogramWire {
    fn from_histogram(h: &Histogram) -> HistogramWire {
        let bins = h
            .bins()
            .into_iter()
            .map(|b| BinWire {
                mean: b.mean,
                count: b.count,
                target: b.target.to_wire(),
            })
            .collect();
        let missing_bin = h.missing_bin().map(|(count, target)| MissingBinWire {
            count,
            target: target.to_wire(),
        });
        HistogramWire {
            max_bins: h.max_bins(),
            gap_weighted: h.gap_weighted(),
            freeze: h.freeze_threshold(),
            categories: h.categories().map(|c| c.to_vec()),
            group_types: h
                .group_types()
                .map(|gt| gt.iter().map(|k| (*k).into()).collect()),
            bins,
            missing_bin,
            minimum: h.minimum(),
            maximum: h.maximum(),
        }
    }

    fn into_histogram(self) -> Result<Histogram, HistogramError> {
        let group_types = self
            .group_types
            .map(|gts| gts.into_iter().map(GroupChildKind::from).collect());
        let mut h = Histogram::create(HistogramOptions {
            bins: self.max_bins,
            gap_weighted: self.gap_weighted,
            categories: self.categories.clone(),
            group_types,
            freeze: self.freeze,
            reservoir: None,
        })?;

        let target_kind = if self.categories.is_some() {
            Some(TargetKind::CategoricalArray)
        } else if let Some(group_types) = h.group_types() {
            Some(TargetKind::Group(
                group_types.iter().map(|k| (*k).into()).collect(),
            ))
        } else {
            // With neither `categories` nor `group_types` declared, a
            // sample wire target's own shape still identifies the kind
            // (each variant has a distinct field set, and `insert_bin` is
            // the only path that can latch `Group`/`NestedHistogram`
            // without also declaring `categories`/`group_types`).
            let sample = self
                .bins
                .iter()
                .find_map(|b| b.target.as_ref())
                .or_else(|| self.missing_bin.as_ref().and_then(|m| m.target.as_ref()));
            match sample {
                Some(TargetWire::Numeric { .. }) => Some(TargetKind::Numeric),
                Some(TargetWire::Categorical { .. }) => Some(TargetKind::CategoricalMap),
                Some(TargetWire::Group(children)) => Some(TargetKind::Group(
                    children
                        .iter()
                        .map(|c| match c {
                            Some(TargetWire::Numeric { .. }) => TargetKind::Numeric,
                            Some(TargetWire::Categorical { .. }) => TargetKind::CategoricalMap,
                            _ => TargetKind::None,
                        })
                        .collect(),
                )),
                Some(TargetWire::Nested(_)) => Some(TargetKind::NestedHistogram),
                None if self.bins.is_empty() && self.missing_bin.is_none() => None,
                None => Some(TargetKind::None),
            }
        };
        h.target_kind = target_kind.clone();

        for bin_wire in self.bins {
            let target = match &target_kind {
                Some(kind) => Target::from_wire(bin_wire.target, kind, h.categories())?,
                None => Target::None,
            };
            h.restore_bin(Bin::new(bin_wire.mean, bin_wire.count, target));
        }

        if let Some(missing) = self.missing_bin {
            let target = match &target_kind {
                Some(kind) => Target::from_wire(missing.target, kind, h.categories())?,
                None => Target::None,
            };
            h.restore_missing(missing.count, target)?;
        }

        h.set_observed_range(self.minimum, self.maximum);

        Ok(h)
    }
}

impl Serialize for Histogram {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        HistogramWire::from_histogram(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Histogram {
    fn deserialize<D>(deserializer: D) -> Result<Histogram, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = HistogramWire::deserialize(deserializer)?;
        wire.into_histogram().map_err(serde::de::Error::custom)
    }
}
