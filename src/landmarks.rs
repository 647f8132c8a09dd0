//! Named body landmarks and the geometry that turns them into lengths.
//!
//! Landmarks live in a normalized space where the subject's stature spans
//! one unit, so a joint-to-joint distance multiplied by the height in
//! centimeters gives a real-world length. A per-measurement calibration
//! factor converts skeletal joint distances into tape measurements.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::LandmarkPoint;

/// Body joints understood by the geometry reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Joint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const ALL: [Joint; 18] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::Neck,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "leftEye",
            Joint::RightEye => "rightEye",
            Joint::LeftEar => "leftEar",
            Joint::RightEar => "rightEar",
            Joint::Neck => "neck",
            Joint::LeftShoulder => "leftShoulder",
            Joint::RightShoulder => "rightShoulder",
            Joint::LeftElbow => "leftElbow",
            Joint::RightElbow => "rightElbow",
            Joint::LeftWrist => "leftWrist",
            Joint::RightWrist => "rightWrist",
            Joint::LeftHip => "leftHip",
            Joint::RightHip => "rightHip",
            Joint::LeftKnee => "leftKnee",
            Joint::RightKnee => "rightKnee",
            Joint::LeftAnkle => "leftAnkle",
            Joint::RightAnkle => "rightAnkle",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Joint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Joint::ALL
            .iter()
            .copied()
            .find(|j| j.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownJoint(s.to_string()))
    }
}

/// Positional index of each joint in a pose detector's output.
const POSE_INDEX: [(usize, Joint); 9] = [
    (0, Joint::Nose),
    (5, Joint::LeftShoulder),
    (6, Joint::RightShoulder),
    (11, Joint::LeftHip),
    (12, Joint::RightHip),
    (13, Joint::LeftElbow),
    (14, Joint::RightElbow),
    (15, Joint::LeftWrist),
    (16, Joint::RightWrist),
];

/// Index of an explicit neck point, when the detector emits one.
const POSE_NECK_INDEX: usize = 33;

/// Raw detector output, indexed positionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseLandmarks {
    pub landmarks: Vec<LandmarkPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_landmarks: Option<Vec<LandmarkPoint>>,
}

/// Named landmarks of one view. Any joint may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: BTreeMap<Joint, LandmarkPoint>,
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate positional detector output into named joints.
    ///
    /// The neck is taken from index 33 when present, otherwise approximated
    /// by the shoulder midpoint.
    pub fn from_pose(pose: &PoseLandmarks) -> Self {
        let mut set = Self::new();
        for (index, joint) in POSE_INDEX {
            if let Some(p) = pose.landmarks.get(index) {
                set.insert(joint, *p);
            }
        }

        let neck = pose.landmarks.get(POSE_NECK_INDEX).copied().or_else(|| {
            match (set.get(Joint::LeftShoulder), set.get(Joint::RightShoulder)) {
                (Some(l), Some(r)) => Some(l.midpoint(&r)),
                _ => None,
            }
        });
        if let Some(neck) = neck {
            set.insert(Joint::Neck, neck);
        }

        set
    }

    pub fn get(&self, joint: Joint) -> Option<LandmarkPoint> {
        self.points.get(&joint).copied()
    }

    pub fn insert(&mut self, joint: Joint, point: LandmarkPoint) -> Option<LandmarkPoint> {
        self.points.insert(joint, point)
    }

    pub fn contains(&self, joint: Joint) -> bool {
        self.points.contains_key(&joint)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, LandmarkPoint)> + '_ {
        self.points.iter().map(|(j, p)| (*j, *p))
    }

    /// Real-world distance between two joints, or `None` if either is missing.
    pub fn distance_cm(
        &self,
        a: Joint,
        b: Joint,
        height_cm: f64,
        calibration: f64,
        axes: Axes,
    ) -> Option<f64> {
        let pa = self.get(a)?;
        let pb = self.get(b)?;
        Some(distance_cm(&pa, &pb, height_cm, calibration, axes))
    }

    /// Length of a polyline through `joints`, or `None` if any joint is missing.
    pub fn path_cm(&self, joints: &[Joint], height_cm: f64, calibration: f64) -> Option<f64> {
        let mut total = 0.0;
        for pair in joints.windows(2) {
            total += self.distance_cm(pair[0], pair[1], height_cm, 1.0, Axes::Planar)?;
        }
        Some(total * calibration)
    }
}

impl FromIterator<(Joint, LandmarkPoint)> for LandmarkSet {
    fn from_iter<T: IntoIterator<Item = (Joint, LandmarkPoint)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Which coordinates participate in a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axes {
    /// x and y only; used for limb lengths and widths in a single view.
    Planar,
    /// x, y and z; used when depth feeds a circumference.
    Spatial,
}

/// Normalized distance scaled to centimeters.
pub fn distance_cm(
    a: &LandmarkPoint,
    b: &LandmarkPoint,
    height_cm: f64,
    calibration: f64,
    axes: Axes,
) -> f64 {
    let d = match axes {
        Axes::Planar => a.distance_2d(b),
        Axes::Spatial => a.distance_3d(b),
    };
    d * height_cm * calibration
}

/// Circumference of an elliptical cross-section with the given front width and depth.
///
/// Uses `2π·sqrt((a² + b²) / 2)` with semi-axes `a = width / 2`, `b = depth / 2`.
pub fn ellipse_circumference(front_width: f64, depth: f64) -> f64 {
    let a = front_width / 2.0;
    let b = depth / 2.0;
    2.0 * PI * ((a * a + b * b) / 2.0).sqrt()
}

/// Front width that reproduces `circumference` when depth is `depth_ratio × width`.
pub fn width_from_circumference(circumference: f64, depth_ratio: f64) -> f64 {
    let half = circumference / (2.0 * PI * ((1.0 + depth_ratio * depth_ratio) / 2.0).sqrt());
    2.0 * half
}

/// Joint-distance to tape-measure calibration constants.
pub mod calibration {
    /// Shoulder joint span to across-shoulder measurement.
    pub const SHOULDER_WIDTH: f64 = 1.10;
    /// Shoulder-elbow-wrist path to sleeve length.
    pub const SLEEVE: f64 = 1.05;
    /// Hip-to-ankle distance to inseam.
    pub const INSEAM: f64 = 0.97;
    /// Shoulder joint span to chest front width.
    pub const CHEST_WIDTH: f64 = 0.87;
    /// Hip joint span to waist front width.
    pub const WAIST_WIDTH: f64 = 1.33;
    /// Hip joint span to hip front width.
    pub const HIP_WIDTH: f64 = 1.60;
    /// Assumed depth / width of each cross-section when no side view exists.
    pub const CHEST_DEPTH_RATIO: f64 = 0.70;
    pub const WAIST_DEPTH_RATIO: f64 = 0.80;
    pub const HIP_DEPTH_RATIO: f64 = 0.75;
    /// Side-view joint separation to torso depth.
    pub const CHEST_DEPTH: f64 = 1.90;
    pub const WAIST_DEPTH: f64 = 1.75;
    pub const HIP_DEPTH: f64 = 1.60;
}
