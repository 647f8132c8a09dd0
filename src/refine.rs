//! Blending of statistical estimates with landmark-derived estimates.
//!
//! Two passes run in order over the same measurement set: a primary pass
//! with front-view landmarks, then a side-view pass that combines torso
//! depth with the front width for chest, waist and hips.

use tracing::debug;

use crate::error::{Error, Result};
use crate::landmarks::{
    calibration, ellipse_circumference, width_from_circumference, Axes, Joint, LandmarkSet,
};
use crate::types::{MeasurementKey, MeasurementSet};

/// Weighted combination of a base estimate and an optional derived estimate.
///
/// Without a derived value the base is returned unchanged.
pub fn blend(base: f64, derived: Option<f64>, landmark_weight: f64) -> f64 {
    match derived {
        Some(d) => base * (1.0 - landmark_weight) + d * landmark_weight,
        None => base,
    }
}

/// Landmark weight per measurement and pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkWeights {
    pub shoulder: f64,
    pub inseam: f64,
    pub hips: f64,
    pub sleeve: f64,
    pub chest: f64,
    pub waist: f64,
    /// Weight of the side-view pass, shared by chest, waist and hips.
    pub side_view: f64,
}

impl Default for LandmarkWeights {
    fn default() -> Self {
        Self {
            shoulder: 0.8,
            inseam: 0.75,
            hips: 0.75,
            sleeve: 0.7,
            chest: 0.7,
            waist: 0.7,
            side_view: 0.6,
        }
    }
}

impl LandmarkWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("shoulder", self.shoulder),
            ("inseam", self.inseam),
            ("hips", self.hips),
            ("sleeve", self.sleeve),
            ("chest", self.chest),
            ("waist", self.waist),
            ("side_view", self.side_view),
        ];
        for (name, w) in all {
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::invalid_params(format!(
                    "landmark weight {name} = {w} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    fn primary(&self, key: MeasurementKey) -> Option<f64> {
        match key {
            MeasurementKey::Shoulder => Some(self.shoulder),
            MeasurementKey::Inseam => Some(self.inseam),
            MeasurementKey::Hips => Some(self.hips),
            MeasurementKey::Sleeve => Some(self.sleeve),
            MeasurementKey::Chest => Some(self.chest),
            MeasurementKey::Waist => Some(self.waist),
            _ => None,
        }
    }
}

/// Measurements the front pass can estimate.
const FRONT_KEYS: [MeasurementKey; 6] = [
    MeasurementKey::Shoulder,
    MeasurementKey::Inseam,
    MeasurementKey::Sleeve,
    MeasurementKey::Chest,
    MeasurementKey::Waist,
    MeasurementKey::Hips,
];

/// Measurements the side pass can estimate.
const SIDE_KEYS: [MeasurementKey; 3] = [
    MeasurementKey::Chest,
    MeasurementKey::Waist,
    MeasurementKey::Hips,
];

/// Cross-section geometry of one torso circumference.
struct Section {
    left: Joint,
    right: Joint,
    width_calibration: f64,
    depth_ratio: f64,
    depth_calibration: f64,
}

fn section(key: MeasurementKey) -> Option<Section> {
    match key {
        MeasurementKey::Chest => Some(Section {
            left: Joint::LeftShoulder,
            right: Joint::RightShoulder,
            width_calibration: calibration::CHEST_WIDTH,
            depth_ratio: calibration::CHEST_DEPTH_RATIO,
            depth_calibration: calibration::CHEST_DEPTH,
        }),
        MeasurementKey::Waist => Some(Section {
            left: Joint::LeftHip,
            right: Joint::RightHip,
            width_calibration: calibration::WAIST_WIDTH,
            depth_ratio: calibration::WAIST_DEPTH_RATIO,
            depth_calibration: calibration::WAIST_DEPTH,
        }),
        MeasurementKey::Hips => Some(Section {
            left: Joint::LeftHip,
            right: Joint::RightHip,
            width_calibration: calibration::HIP_WIDTH,
            depth_ratio: calibration::HIP_DEPTH_RATIO,
            depth_calibration: calibration::HIP_DEPTH,
        }),
        _ => None,
    }
}

fn front_width(key: MeasurementKey, front: &LandmarkSet, height_cm: f64) -> Option<f64> {
    let s = section(key)?;
    front.distance_cm(s.left, s.right, height_cm, s.width_calibration, Axes::Planar)
}

/// Mean of the left and right estimates, or whichever side is available.
fn bilateral(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (l, r) => l.or(r),
    }
}

/// Landmark-derived estimate of `key` from a front view.
pub fn front_estimate(key: MeasurementKey, front: &LandmarkSet, height_cm: f64) -> Option<f64> {
    match key {
        MeasurementKey::Shoulder => front.distance_cm(
            Joint::LeftShoulder,
            Joint::RightShoulder,
            height_cm,
            calibration::SHOULDER_WIDTH,
            Axes::Planar,
        ),
        MeasurementKey::Sleeve => bilateral(
            front.path_cm(
                &[Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist],
                height_cm,
                calibration::SLEEVE,
            ),
            front.path_cm(
                &[Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist],
                height_cm,
                calibration::SLEEVE,
            ),
        ),
        MeasurementKey::Inseam => bilateral(
            front.distance_cm(
                Joint::LeftHip,
                Joint::LeftAnkle,
                height_cm,
                calibration::INSEAM,
                Axes::Planar,
            ),
            front.distance_cm(
                Joint::RightHip,
                Joint::RightAnkle,
                height_cm,
                calibration::INSEAM,
                Axes::Planar,
            ),
        ),
        MeasurementKey::Chest | MeasurementKey::Waist | MeasurementKey::Hips => {
            let s = section(key)?;
            let width = front_width(key, front, height_cm)?;
            Some(ellipse_circumference(width, width * s.depth_ratio))
        }
        _ => None,
    }
}

/// Landmark-derived circumference of `key` from side-view depth and a front width.
pub fn side_estimate(
    key: MeasurementKey,
    front_width: f64,
    side: &LandmarkSet,
    height_cm: f64,
) -> Option<f64> {
    let s = section(key)?;
    let depth = side.distance_cm(s.left, s.right, height_cm, s.depth_calibration, Axes::Spatial)?;
    Some(ellipse_circumference(front_width, depth))
}

/// Blend front-view estimates into `set`. Returns the keys that received landmark input.
pub fn apply_front_pass(
    set: &mut MeasurementSet,
    front: &LandmarkSet,
    height_cm: f64,
    weights: &LandmarkWeights,
) -> Vec<MeasurementKey> {
    let mut refined = Vec::new();
    for key in FRONT_KEYS {
        let (Some(base), Some(weight)) = (set.get(key), weights.primary(key)) else {
            continue;
        };
        let derived = front_estimate(key, front, height_cm);
        if derived.is_none() {
            debug!(%key, "front landmarks missing, keeping statistical estimate");
            continue;
        }
        set.insert(key, blend(base, derived, weight));
        refined.push(key);
    }
    refined
}

/// Blend side-view circumferences into `set`.
///
/// The front width comes from the front landmarks when present, otherwise
/// it is recovered from the current circumference and the assumed depth ratio.
pub fn apply_side_pass(
    set: &mut MeasurementSet,
    front: Option<&LandmarkSet>,
    side: &LandmarkSet,
    height_cm: f64,
    weights: &LandmarkWeights,
) -> Vec<MeasurementKey> {
    let mut refined = Vec::new();
    for key in SIDE_KEYS {
        let (Some(base), Some(s)) = (set.get(key), section(key)) else {
            continue;
        };
        let width = front
            .and_then(|f| front_width(key, f, height_cm))
            .unwrap_or_else(|| width_from_circumference(base, s.depth_ratio));
        let derived = side_estimate(key, width, side, height_cm);
        if derived.is_none() {
            debug!(%key, "side landmarks missing, keeping current estimate");
            continue;
        }
        set.insert(key, blend(base, derived, weights.side_view));
        refined.push(key);
    }
    refined
}
