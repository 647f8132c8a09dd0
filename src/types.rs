use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Centimeters per inch.
pub const CM_PER_INCH: f64 = 2.54;

/// Supported stature range in centimeters.
pub const MIN_HEIGHT_CM: f64 = 100.0;
pub const MAX_HEIGHT_CM: f64 = 220.0;

/// The fixed vocabulary of body measurements, all in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementKey {
    Height,
    Chest,
    Waist,
    Hips,
    Shoulder,
    Inseam,
    Sleeve,
    Neck,
    Thigh,
    UpperArm,
    Forearm,
    Calf,
    NeckCircumference,
    ShoulderWidth,
}

impl MeasurementKey {
    pub const ALL: [MeasurementKey; 14] = [
        MeasurementKey::Height,
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
        MeasurementKey::NeckCircumference,
        MeasurementKey::ShoulderWidth,
    ];

    /// Measurements estimated directly from height; everything else is derived from these.
    pub const PRIMARY: [MeasurementKey; 8] = [
        MeasurementKey::Chest,
        MeasurementKey::Waist,
        MeasurementKey::Hips,
        MeasurementKey::Shoulder,
        MeasurementKey::Inseam,
        MeasurementKey::Sleeve,
        MeasurementKey::Neck,
        MeasurementKey::Thigh,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            MeasurementKey::Height => "height",
            MeasurementKey::Chest => "chest",
            MeasurementKey::Waist => "waist",
            MeasurementKey::Hips => "hips",
            MeasurementKey::Shoulder => "shoulder",
            MeasurementKey::Inseam => "inseam",
            MeasurementKey::Sleeve => "sleeve",
            MeasurementKey::Neck => "neck",
            MeasurementKey::Thigh => "thigh",
            MeasurementKey::UpperArm => "upperArm",
            MeasurementKey::Forearm => "forearm",
            MeasurementKey::Calf => "calf",
            MeasurementKey::NeckCircumference => "neckCircumference",
            MeasurementKey::ShoulderWidth => "shoulderWidth",
        }
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MeasurementKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownMeasurement(s.to_string()))
    }
}

/// A set of named body measurements in centimeters.
///
/// Keys are optional; `height` is present on every set produced by the
/// estimator and always comes from user input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementSet {
    values: BTreeMap<MeasurementKey, f64>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: MeasurementKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn insert(&mut self, key: MeasurementKey, value: f64) -> Option<f64> {
        self.values.insert(key, value)
    }

    pub fn remove(&mut self, key: MeasurementKey) -> Option<f64> {
        self.values.remove(&key)
    }

    pub fn contains(&self, key: MeasurementKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn height(&self) -> Option<f64> {
        self.get(MeasurementKey::Height)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (key, value) pairs in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (MeasurementKey, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = MeasurementKey> + '_ {
        self.values.keys().copied()
    }

    /// Scale a single measurement in place. Absent keys are left absent.
    pub fn scale(&mut self, key: MeasurementKey, factor: f64) {
        if let Some(v) = self.values.get_mut(&key) {
            *v *= factor;
        }
    }

    /// True if every value is finite and non-negative.
    pub fn is_physical(&self) -> bool {
        self.values.values().all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Copy with every value rounded to `decimals` places, for presentation.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| (*k, (v * factor).round() / factor))
                .collect(),
        }
    }
}

impl FromIterator<(MeasurementKey, f64)> for MeasurementSet {
    fn from_iter<T: IntoIterator<Item = (MeasurementKey, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(MeasurementKey, f64); N]> for MeasurementSet {
    fn from(pairs: [(MeasurementKey, f64); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Gender category selecting proportion tables and ratio bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Pick the constant for this gender; `Other` takes the mean of both.
    pub fn select(&self, male: f64, female: f64) -> f64 {
        match self {
            Gender::Male => male,
            Gender::Female => female,
            Gender::Other => (male + female) / 2.0,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(Error::UnknownGender(s.to_string())),
        }
    }
}

/// Parametric body model label. Selects scale adjustments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "SMPL")]
    Smpl,
    #[serde(rename = "SMPL-X")]
    SmplX,
    #[serde(rename = "STAR")]
    Star,
    #[serde(rename = "PARE")]
    Pare,
    #[serde(rename = "SPIN")]
    Spin,
    #[serde(rename = "SIZER")]
    Sizer,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 6] = [
        ModelVariant::Smpl,
        ModelVariant::SmplX,
        ModelVariant::Star,
        ModelVariant::Pare,
        ModelVariant::Spin,
        ModelVariant::Sizer,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Smpl => "SMPL",
            ModelVariant::SmplX => "SMPL-X",
            ModelVariant::Star => "STAR",
            ModelVariant::Pare => "PARE",
            ModelVariant::Spin => "SPIN",
            ModelVariant::Sizer => "SIZER",
        }
    }

    /// Variants that also report neck circumference and shoulder width.
    pub const fn has_extended_measurements(&self) -> bool {
        matches!(self, ModelVariant::SmplX | ModelVariant::Sizer)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SMPL" => Ok(ModelVariant::Smpl),
            "SMPLX" => Ok(ModelVariant::SmplX),
            "STAR" => Ok(ModelVariant::Star),
            "PARE" => Ok(ModelVariant::Pare),
            "SPIN" => Ok(ModelVariant::Spin),
            "SIZER" => Ok(ModelVariant::Sizer),
            _ => Err(Error::UnknownModelVariant(s.to_string())),
        }
    }
}

/// Selects one of the two hips:waist bound tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecisionMode {
    #[default]
    Standard,
    HighPrecision,
}

impl FromStr for PrecisionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(PrecisionMode::Standard),
            "high-precision" | "high" => Ok(PrecisionMode::HighPrecision),
            _ => Err(Error::UnknownPrecisionMode(s.to_string())),
        }
    }
}

/// Requested accuracy of a synthetic dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccuracyLevel {
    #[default]
    Standard,
    High,
    ResearchGrade,
}

impl AccuracyLevel {
    /// Scales the per-measurement variance of generated samples.
    pub const fn variance_multiplier(&self) -> f64 {
        match self {
            AccuracyLevel::Standard => 0.8,
            AccuracyLevel::High => 0.4,
            AccuracyLevel::ResearchGrade => 0.2,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            AccuracyLevel::Standard => "standard accuracy",
            AccuracyLevel::High => "high accuracy",
            AccuracyLevel::ResearchGrade => "research-grade accuracy",
        }
    }
}

impl FromStr for AccuracyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(AccuracyLevel::Standard),
            "high" => Ok(AccuracyLevel::High),
            "research-grade" | "research" => Ok(AccuracyLevel::ResearchGrade),
            _ => Err(Error::UnknownAccuracyLevel(s.to_string())),
        }
    }
}

/// Unit system of user-entered height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSystem {
    #[default]
    Metric,
    Imperial,
}

impl MeasurementSystem {
    /// Convert a raw height in this system (cm or inches) to centimeters.
    pub fn to_cm(&self, value: f64) -> f64 {
        match self {
            MeasurementSystem::Metric => value,
            MeasurementSystem::Imperial => value * CM_PER_INCH,
        }
    }

    /// Format a length given in centimeters. Imperial rounds to the nearest quarter inch.
    pub fn format_length(&self, cm: f64) -> String {
        match self {
            MeasurementSystem::Metric => format!("{:.1} cm", cm),
            MeasurementSystem::Imperial => {
                let inches = cm / CM_PER_INCH;
                let rounded = (inches * 4.0).round() / 4.0;
                format!("{:.1}\"", rounded)
            }
        }
    }

    /// Format a stature given in centimeters, as feet and inches for imperial.
    pub fn format_height(&self, cm: f64) -> String {
        match self {
            MeasurementSystem::Metric => format!("{:.1} cm", cm),
            MeasurementSystem::Imperial => {
                let total_inches = cm / CM_PER_INCH;
                let mut feet = (total_inches / 12.0).floor() as u32;
                let mut inches = (total_inches % 12.0).round() as u32;
                if inches == 12 {
                    feet += 1;
                    inches = 0;
                }
                format!("{}'{}\"", feet, inches)
            }
        }
    }
}

impl FromStr for MeasurementSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "metric" | "cm" => Ok(MeasurementSystem::Metric),
            "imperial" | "in" => Ok(MeasurementSystem::Imperial),
            _ => Err(Error::UnknownMeasurementSystem(s.to_string())),
        }
    }
}

/// A 3D landmark in normalized image space (roughly [-0.5, 0.5] per axis, y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl LandmarkPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub const fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Planar distance, ignoring depth.
    pub fn distance_2d(&self, other: &LandmarkPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_3d(&self, other: &LandmarkPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Midpoint of two landmarks; visibility is the weaker of the two.
    pub fn midpoint(&self, other: &LandmarkPoint) -> LandmarkPoint {
        let visibility = match (self.visibility, other.visibility) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        LandmarkPoint {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility,
        }
    }
}

impl std::ops::Add for LandmarkPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
            visibility: self.visibility,
        }
    }
}

impl std::ops::Sub for LandmarkPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
            visibility: self.visibility,
        }
    }
}

impl std::ops::Mul<f64> for LandmarkPoint {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
            visibility: self.visibility,
        }
    }
}
