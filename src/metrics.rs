//! Evaluation of a candidate measurement set against a dataset.
//!
//! Errors are averaged per sample first and then across samples. Height is
//! an input rather than an estimate and is never compared.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::types::{MeasurementKey, MeasurementSet};

/// How samples sharing no measurement with the candidate are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyOverlapPolicy {
    /// The sample contributes zero error but still counts in the denominator.
    #[default]
    CountAsZero,
    /// The sample is left out of the denominator.
    Exclude,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationParams {
    pub empty_overlap: EmptyOverlapPolicy,
}

/// Aggregated error of one measurement across all samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMeasurement {
    pub name: MeasurementKey,
    /// Mean percentage deviation.
    pub deviation: f64,
    /// Mean absolute error in centimeters.
    pub mae: f64,
}

/// Summary of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Mean absolute error in centimeters.
    pub mae: f64,

    /// Mean percentage deviation.
    pub percentage_deviation: f64,

    /// Number of samples in the dataset.
    pub sample_count: usize,

    /// Samples without any measurement in common with the candidate.
    ///
    /// Only left out of the averages under [`EmptyOverlapPolicy::Exclude`].
    pub excluded_samples: usize,

    /// Per-measurement errors, least reliable first.
    pub key_measurements: Vec<KeyMeasurement>,
}

#[derive(Default)]
struct KeyAccumulator {
    abs_sum: f64,
    abs_count: usize,
    pct_sum: f64,
    pct_count: usize,
}

/// Listed in the ranking whenever the candidate has them.
const PRIORITY_KEYS: [MeasurementKey; 3] =
    [MeasurementKey::Chest, MeasurementKey::Waist, MeasurementKey::Hips];

/// Score `candidate` against every sample of `dataset`.
pub fn evaluate(
    candidate: &MeasurementSet,
    dataset: &Dataset,
    params: &EvaluationParams,
) -> Result<EvaluationResult> {
    if dataset.samples.is_empty() {
        return Err(Error::invalid_params("dataset has no samples"));
    }

    let mut mae_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut empty = 0;
    let mut per_key: BTreeMap<MeasurementKey, KeyAccumulator> = BTreeMap::new();

    for sample in &dataset.samples {
        let mut abs_errors = Vec::new();
        let mut pct_errors = Vec::new();

        for (key, manual) in sample.measurements.iter() {
            if key == MeasurementKey::Height {
                continue;
            }
            let Some(predicted) = candidate.get(key) else {
                continue;
            };
            let acc = per_key.entry(key).or_default();

            let abs = (manual - predicted).abs();
            abs_errors.push(abs);
            acc.abs_sum += abs;
            acc.abs_count += 1;

            if manual != 0.0 {
                let pct = ratio(abs, manual);
                pct_errors.push(pct);
                acc.pct_sum += pct;
                acc.pct_count += 1;
            }
        }

        if abs_errors.is_empty() {
            empty += 1;
            continue;
        }
        mae_sum += mean(&abs_errors);
        pct_sum += mean(&pct_errors);
    }

    let denominator = match params.empty_overlap {
        EmptyOverlapPolicy::CountAsZero => dataset.samples.len(),
        EmptyOverlapPolicy::Exclude => dataset.samples.len() - empty,
    };
    let (mae, percentage_deviation) = if denominator > 0 {
        (mae_sum / denominator as f64, pct_sum / denominator as f64)
    } else {
        (0.0, 0.0)
    };

    let mut key_measurements: Vec<KeyMeasurement> = per_key
        .into_iter()
        .map(|(name, acc)| KeyMeasurement {
            name,
            deviation: average(acc.pct_sum, acc.pct_count),
            mae: average(acc.abs_sum, acc.abs_count),
        })
        .collect();
    key_measurements.sort_by(|a, b| b.deviation.total_cmp(&a.deviation));

    // Torso keys the candidate reports are always listed, at zero if unscored.
    for key in PRIORITY_KEYS {
        let reported = candidate.get(key).is_some_and(|v| v != 0.0);
        if reported && !key_measurements.iter().any(|k| k.name == key) {
            key_measurements.push(KeyMeasurement {
                name: key,
                deviation: 0.0,
                mae: 0.0,
            });
        }
    }

    info!(
        samples = dataset.samples.len(),
        empty, mae, percentage_deviation, "evaluation complete"
    );

    Ok(EvaluationResult {
        mae,
        percentage_deviation,
        sample_count: dataset.samples.len(),
        excluded_samples: empty,
        key_measurements,
    })
}

/// Number of measurements reported as problems.
const PROBLEM_COUNT: usize = 3;

/// Interpretation of an [`EvaluationResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyAnalysis {
    /// `100 - 2 × deviation`, floored at zero.
    pub precision_score: f64,
    pub problem_measurements: Vec<KeyMeasurement>,
    pub recommendations: Vec<String>,
}

impl AccuracyAnalysis {
    pub fn from_result(result: &EvaluationResult) -> Self {
        let precision_score = (100.0 - result.percentage_deviation * 2.0).max(0.0);
        let problem_measurements: Vec<KeyMeasurement> = result
            .key_measurements
            .iter()
            .take(PROBLEM_COUNT)
            .cloned()
            .collect();
        let recommendations = problem_measurements.iter().map(recommendation).collect();
        Self {
            precision_score,
            problem_measurements,
            recommendations,
        }
    }
}

fn recommendation(item: &KeyMeasurement) -> String {
    let d = item.deviation;
    if d > 15.0 {
        format!("{}: significant deviation ({:.1}%) requires calibration", item.name, d)
    } else if d > 8.0 {
        format!("{}: consider refinement ({:.1}%)", item.name, d)
    } else {
        format!("{}: acceptable accuracy ({:.1}%)", item.name, d)
    }
}

/// Calculate percentage ratio, handling division by zero.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        (numerator / denominator) * 100.0
    } else {
        0.0
    }
}

fn average(sum: f64, count: usize) -> f64 {
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    average(values.iter().sum(), values.len())
}
