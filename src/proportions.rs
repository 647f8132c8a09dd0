//! Static anthropometric proportion tables.
//!
//! Every measurement is expressed as a fraction of stature. The tables carry
//! one column per gender; [`Gender::Other`] uses the mean of both columns.

use crate::error::{Error, Result};
use crate::random::RandomSource;
use crate::types::{Gender, MeasurementKey, MeasurementSet, ModelVariant};

/// Base ratio (measurement / height) and relative variance of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionEntry {
    pub base_ratio: f64,
    pub variance: f64,
}

/// Absolute plausibility window for a measurement as a fraction of height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightWindow {
    pub min_fraction: f64,
    pub max_fraction: f64,
}

/// Keys covered by the proportion table, in generation order.
pub const PROPORTION_KEYS: [MeasurementKey; 11] = [
    MeasurementKey::Chest,
    MeasurementKey::Waist,
    MeasurementKey::Hips,
    MeasurementKey::Shoulder,
    MeasurementKey::Inseam,
    MeasurementKey::Sleeve,
    MeasurementKey::Neck,
    MeasurementKey::Thigh,
    MeasurementKey::UpperArm,
    MeasurementKey::Forearm,
    MeasurementKey::Calf,
];

// (male ratio, female ratio, variance)
fn proportion_row(key: MeasurementKey) -> Option<(f64, f64, f64)> {
    let row = match key {
        MeasurementKey::Chest => (0.520, 0.505, 0.030),
        MeasurementKey::Waist => (0.450, 0.440, 0.035),
        MeasurementKey::Hips => (0.520, 0.555, 0.025),
        MeasurementKey::Shoulder => (0.245, 0.225, 0.020),
        MeasurementKey::Inseam => (0.470, 0.450, 0.015),
        MeasurementKey::Sleeve => (0.340, 0.310, 0.015),
        MeasurementKey::Neck => (0.195, 0.165, 0.020),
        MeasurementKey::Thigh => (0.310, 0.330, 0.030),
        MeasurementKey::UpperArm => (0.180, 0.160, 0.030),
        MeasurementKey::Forearm => (0.150, 0.130, 0.025),
        MeasurementKey::Calf => (0.210, 0.200, 0.025),
        _ => return None,
    };
    Some(row)
}

/// Proportion entry for `key`, or `None` if the key is not height-proportional.
pub fn proportion(key: MeasurementKey, gender: Gender) -> Option<ProportionEntry> {
    proportion_row(key).map(|(male, female, variance)| ProportionEntry {
        base_ratio: gender.select(male, female),
        variance,
    })
}

/// Plausibility window of `key` relative to height.
pub fn height_window(key: MeasurementKey, gender: Gender) -> Option<HeightWindow> {
    // (male min, male max, female min, female max)
    let (m_lo, m_hi, f_lo, f_hi) = match key {
        MeasurementKey::Chest => (0.46, 0.60, 0.45, 0.58),
        MeasurementKey::Waist => (0.39, 0.53, 0.38, 0.51),
        MeasurementKey::Hips => (0.46, 0.58, 0.50, 0.62),
        MeasurementKey::Shoulder => (0.22, 0.27, 0.20, 0.25),
        MeasurementKey::Inseam => (0.43, 0.50, 0.41, 0.48),
        MeasurementKey::Sleeve => (0.31, 0.37, 0.28, 0.34),
        MeasurementKey::Neck => (0.17, 0.22, 0.14, 0.19),
        MeasurementKey::Thigh => (0.27, 0.35, 0.29, 0.38),
        MeasurementKey::UpperArm => (0.15, 0.21, 0.13, 0.19),
        MeasurementKey::Forearm => (0.13, 0.17, 0.11, 0.15),
        MeasurementKey::Calf => (0.18, 0.24, 0.17, 0.23),
        _ => return None,
    };
    Some(HeightWindow {
        min_fraction: gender.select(m_lo, f_lo),
        max_fraction: gender.select(m_hi, f_hi),
    })
}

/// Reference stature used to compute the height scale factor.
pub fn standard_height(gender: Gender) -> f64 {
    match gender {
        Gender::Male => 175.0,
        Gender::Female => 162.0,
        Gender::Other => 168.0,
    }
}

/// Gender-specific correction of the raw height proportion.
///
/// Only the eight primary measurements have an entry; asking for any other
/// key is an error rather than a silent 1.0.
pub fn base_scale_factor(key: MeasurementKey, gender: Gender) -> Result<f64> {
    let (male, female) = match key {
        MeasurementKey::Chest => (1.015, 0.990),
        MeasurementKey::Waist => (0.980, 0.950),
        MeasurementKey::Hips => (0.990, 1.025),
        MeasurementKey::Shoulder => (1.025, 0.980),
        MeasurementKey::Sleeve => (1.030, 1.020),
        MeasurementKey::Inseam => (1.020, 1.030),
        MeasurementKey::Neck => (0.970, 0.930),
        MeasurementKey::Thigh => (0.985, 0.995),
        other => return Err(Error::UnsupportedMeasurement(other)),
    };
    Ok(gender.select(male, female))
}

pub fn model_adjustment(variant: ModelVariant) -> f64 {
    match variant {
        ModelVariant::Smpl => 1.00,
        ModelVariant::SmplX => 1.04,
        ModelVariant::Star => 1.02,
        ModelVariant::Pare => 1.03,
        ModelVariant::Spin => 1.02,
        ModelVariant::Sizer => 1.05,
    }
}

/// Three-bucket step on `height / standard_height`.
pub fn height_adjustment(height_scale: f64) -> f64 {
    if height_scale > 1.05 {
        1.01
    } else if height_scale < 0.95 {
        0.99
    } else {
        1.00
    }
}

/// Symmetric multiplicative jitter of ±0.5 %.
pub fn scale_jitter<R: RandomSource + ?Sized>(rng: &mut R) -> f64 {
    1.0 + (rng.next_f64() - 0.5) * 0.01
}

/// Full multiplier applied to a primary measurement for a given body model.
pub fn scale_factor<R: RandomSource + ?Sized>(
    key: MeasurementKey,
    gender: Gender,
    variant: ModelVariant,
    height_scale: f64,
    rng: &mut R,
) -> Result<f64> {
    let base = base_scale_factor(key, gender)?;
    Ok(base * model_adjustment(variant) * height_adjustment(height_scale) * scale_jitter(rng))
}

/// Height-proportional estimate of the primary measurements.
pub fn statistical_estimate(height_cm: f64, gender: Gender) -> MeasurementSet {
    MeasurementKey::PRIMARY
        .iter()
        .filter_map(|&key| proportion(key, gender).map(|p| (key, height_cm * p.base_ratio)))
        .collect()
}
