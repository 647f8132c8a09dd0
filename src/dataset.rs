//! Synthetic anthropometric datasets.
//!
//! Each sample draws a gender, a height and two body-shape factors, scales
//! the proportion table by them, adds a smoothed random variation and runs
//! the result through the constraint corrector. A weight is derived from a
//! BMI model and 18 landmarks are placed on a template skeleton.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constraints::{clamp_to_height_windows, ConstraintCorrector};
use crate::error::{Error, Result};
use crate::landmarks::{Joint, LandmarkSet};
use crate::proportions::{proportion, PROPORTION_KEYS};
use crate::random::RandomSource;
use crate::types::{AccuracyLevel, Gender, LandmarkPoint, MeasurementKey, MeasurementSet, PrecisionMode};

/// Dataset generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetParams {
    pub sample_size: usize,
    pub accuracy: AccuracyLevel,
    pub name: String,
    pub description: String,
}

impl Default for DatasetParams {
    fn default() -> Self {
        Self {
            sample_size: 10,
            accuracy: AccuracyLevel::Standard,
            name: "Synthetic".into(),
            description: "Synthetic anthropometric samples generated from proportion tables".into(),
        }
    }
}

impl DatasetParams {
    pub fn with_samples(sample_size: usize, accuracy: AccuracyLevel) -> Self {
        Self {
            sample_size,
            accuracy,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSample {
    pub id: String,
    pub gender: Gender,
    pub age: u32,
    pub height: f64,
    pub weight: f64,
    pub measurements: MeasurementSet,
    #[serde(default)]
    pub landmarks: LandmarkSet,
}

impl DatasetSample {
    pub fn bmi(&self) -> f64 {
        let m = self.height / 100.0;
        self.weight / (m * m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub name: String,
    pub description: String,
    pub sample_count: usize,
    pub samples: Vec<DatasetSample>,
}

impl Dataset {
    /// Wrap hand-built samples.
    pub fn from_samples(name: impl Into<String>, samples: Vec<DatasetSample>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sample_count: samples.len(),
            samples,
        }
    }
}

const MALE_HEIGHT_RANGE: (f64, f64) = (172.0, 190.0);
const FEMALE_HEIGHT_RANGE: (f64, f64) = (162.0, 177.0);
const WIDTH_FACTOR_RANGE: f64 = 0.05;
const SHAPE_FACTOR_RANGE: f64 = 0.03;
const AGE_RANGE: (u32, u32) = (20, 65);

/// Randomized body-shape factors of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFactors {
    /// Overall breadth, in `[-0.05, 0.05]`.
    pub width: f64,
    /// Waist-to-hip shape, in `[-0.03, 0.03]`.
    pub shape: f64,
}

impl ShapeFactors {
    pub fn sample<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self {
            width: rng.uniform(-WIDTH_FACTOR_RANGE, WIDTH_FACTOR_RANGE),
            shape: rng.uniform(-SHAPE_FACTOR_RANGE, SHAPE_FACTOR_RANGE),
        }
    }

    /// Multiplicative sensitivity of a measurement to the shape factors.
    pub fn sensitivity(&self, key: MeasurementKey) -> f64 {
        match key {
            MeasurementKey::Chest | MeasurementKey::Shoulder => 1.0 + self.width * 0.7,
            MeasurementKey::Waist => 1.0 + self.width * 0.8 + self.shape,
            MeasurementKey::Hips => 1.0 + self.width * 0.6 - self.shape * 0.4,
            MeasurementKey::Thigh | MeasurementKey::Calf => 1.0 + self.width * 0.4,
            _ => 1.0,
        }
    }

    /// BMI scaled by the shape factors from a per-gender base.
    pub fn bmi(&self, gender: Gender) -> f64 {
        let base = gender.select(23.5, 22.0);
        base * (1.0 + self.width * 1.8 + self.shape * 0.8)
    }
}

// Template skeleton: stature spans one unit, y increases upward.
const TEMPLATE: [(Joint, f64, f64, f64); 18] = [
    (Joint::Nose, 0.0, 0.435, 0.05),
    (Joint::LeftEye, 0.018, 0.448, 0.04),
    (Joint::RightEye, -0.018, 0.448, 0.04),
    (Joint::LeftEar, 0.04, 0.44, 0.0),
    (Joint::RightEar, -0.04, 0.44, 0.0),
    (Joint::Neck, 0.0, 0.34, 0.0),
    (Joint::LeftShoulder, 0.11, 0.32, 0.0),
    (Joint::RightShoulder, -0.11, 0.32, 0.0),
    (Joint::LeftElbow, 0.135, 0.14, 0.0),
    (Joint::RightElbow, -0.135, 0.14, 0.0),
    (Joint::LeftWrist, 0.145, 0.0, 0.0),
    (Joint::RightWrist, -0.145, 0.0, 0.0),
    (Joint::LeftHip, 0.06, 0.02, 0.0),
    (Joint::RightHip, -0.06, 0.02, 0.0),
    (Joint::LeftKnee, 0.065, -0.22, 0.0),
    (Joint::RightKnee, -0.065, -0.22, 0.0),
    (Joint::LeftAnkle, 0.065, -0.45, 0.0),
    (Joint::RightAnkle, -0.065, -0.45, 0.0),
];

fn is_lower_body(joint: Joint) -> bool {
    matches!(
        joint,
        Joint::LeftHip
            | Joint::RightHip
            | Joint::LeftKnee
            | Joint::RightKnee
            | Joint::LeftAnkle
            | Joint::RightAnkle
    )
}

/// Place the template skeleton, widened by the shape factors and jittered.
pub fn synthetic_landmarks<R: RandomSource + ?Sized>(
    factors: &ShapeFactors,
    variance_multiplier: f64,
    rng: &mut R,
) -> LandmarkSet {
    let jitter_scale = 0.01 * variance_multiplier;
    TEMPLATE
        .iter()
        .map(|&(joint, x, y, z)| {
            let lateral = if is_lower_body(joint) {
                1.0 + factors.width + factors.shape
            } else {
                1.0 + factors.width
            };
            let jx = (rng.next_f64() - 0.5) * jitter_scale;
            let jy = (rng.next_f64() - 0.5) * jitter_scale;
            let jz = (rng.next_f64() - 0.5) * jitter_scale;
            let visibility = rng.uniform(0.9, 1.0);
            let point = LandmarkPoint::new(x * lateral + jx, y + jy, z + jz).with_visibility(visibility);
            (joint, point)
        })
        .collect()
}

/// Generate one sample.
pub fn generate_sample<R: RandomSource + ?Sized>(
    index: usize,
    accuracy: AccuracyLevel,
    rng: &mut R,
) -> DatasetSample {
    let gender = if rng.next_f64() < 0.5 {
        Gender::Male
    } else {
        Gender::Female
    };
    let (lo, hi) = match gender {
        Gender::Female => FEMALE_HEIGHT_RANGE,
        _ => MALE_HEIGHT_RANGE,
    };
    let height = rng.uniform(lo, hi);
    let factors = ShapeFactors::sample(rng);
    let vm = accuracy.variance_multiplier();

    let mut measurements = MeasurementSet::new();
    measurements.insert(MeasurementKey::Height, height);
    for key in PROPORTION_KEYS {
        let Some(entry) = proportion(key, gender) else {
            continue;
        };
        let variation = 1.0 + rng.uniform(0.0, PI).sin() * entry.variance * vm;
        let value = height * entry.base_ratio * factors.sensitivity(key) * variation;
        measurements.insert(key, value);
    }

    clamp_to_height_windows(&mut measurements, gender);
    ConstraintCorrector::new(gender, PrecisionMode::Standard).correct(&mut measurements);

    let bmi = factors.bmi(gender);
    let weight = bmi * (height / 100.0).powi(2);
    let age = rng.uniform_inclusive(AGE_RANGE.0, AGE_RANGE.1);
    let landmarks = synthetic_landmarks(&factors, vm, rng);

    DatasetSample {
        id: format!("sample-{}", index + 1),
        gender,
        age,
        height,
        weight,
        measurements,
        landmarks,
    }
}

/// Generate a dataset of `params.sample_size` independent samples.
pub fn generate_dataset<R: RandomSource + ?Sized>(
    params: &DatasetParams,
    rng: &mut R,
) -> Result<Dataset> {
    if params.sample_size == 0 {
        return Err(Error::invalid_params("sample size must be positive"));
    }

    let samples: Vec<DatasetSample> = (0..params.sample_size)
        .map(|i| generate_sample(i, params.accuracy, rng))
        .collect();

    let males = samples.iter().filter(|s| s.gender == Gender::Male).count();
    info!(
        name = %params.name,
        samples = samples.len(),
        males,
        accuracy = ?params.accuracy,
        "generated synthetic dataset"
    );

    Ok(Dataset {
        name: params.name.clone(),
        description: params.description.clone(),
        sample_count: samples.len(),
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConstantSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_samples_rejected() {
        let params = DatasetParams::with_samples(0, AccuracyLevel::High);
        let err = generate_dataset(&params, &mut ConstantSource::midpoint()).unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn default_params() {
        let params = DatasetParams::default();
        assert_eq!(params.sample_size, 10);
        assert_eq!(params.accuracy, AccuracyLevel::Standard);
    }

    #[test]
    fn midpoint_sample() {
        let sample = generate_sample(0, AccuracyLevel::Standard, &mut ConstantSource::midpoint());
        // 0.5 is not below 0.5
        assert_eq!(sample.gender, Gender::Female);
        assert!((sample.height - 169.5).abs() < 1e-9);
        assert_eq!(sample.id, "sample-1");
        assert_eq!(sample.landmarks.len(), 18);
        assert!((sample.bmi() - 22.0).abs() < 1e-9);
        assert!((20..=65).contains(&sample.age));
    }

    #[test]
    fn sample_has_every_proportion_key() {
        let mut rng = StdRng::seed_from_u64(11);
        let sample = generate_sample(4, AccuracyLevel::ResearchGrade, &mut rng);
        for key in PROPORTION_KEYS {
            assert!(sample.measurements.contains(key), "{key}");
        }
        assert_eq!(sample.measurements.height(), Some(sample.height));
        assert!(sample.measurements.is_physical());
    }

    #[test]
    fn visibility_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let sample = generate_sample(0, AccuracyLevel::Standard, &mut rng);
        for (_, p) in sample.landmarks.iter() {
            let v = p.visibility.unwrap();
            assert!((0.9..=1.0).contains(&v));
        }
    }

    #[test]
    fn shape_sensitivities() {
        let f = ShapeFactors {
            width: 0.05,
            shape: 0.03,
        };
        assert!((f.sensitivity(MeasurementKey::Chest) - 1.035).abs() < 1e-12);
        assert!((f.sensitivity(MeasurementKey::Waist) - 1.07).abs() < 1e-12);
        assert!((f.sensitivity(MeasurementKey::Hips) - 1.018).abs() < 1e-12);
        assert!((f.sensitivity(MeasurementKey::Calf) - 1.02).abs() < 1e-12);
        assert_eq!(f.sensitivity(MeasurementKey::Sleeve), 1.0);
    }

    #[test]
    fn dataset_serializes_camel_case() {
        let params = DatasetParams::with_samples(2, AccuracyLevel::High);
        let dataset = generate_dataset(&params, &mut StdRng::seed_from_u64(1)).unwrap();
        let json = serde_json::to_string(&dataset).unwrap();
        assert!(json.contains("\"sampleCount\":2"));
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.samples.len(), 2);
    }
}
