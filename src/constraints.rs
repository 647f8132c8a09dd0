//! Anatomical constraint correction.
//!
//! Pairwise ratios between measurements are pulled into gender-specific
//! bounds in a fixed order. Two-sided pairs move both measurements toward
//! the violated boundary while preserving their 0.6/0.4 weighted average;
//! single-sided pairs only move the numerator. One pass is performed by
//! default, so a later correction can re-violate an earlier pair. Those
//! residual violations are reported by [`ConstraintCorrector::check`].

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::proportions::height_window;
use crate::types::{Gender, MeasurementKey, MeasurementSet, ModelVariant, PrecisionMode};

/// Inclusive ratio bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioBounds {
    pub min: f64,
    pub max: f64,
}

impl RatioBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn for_gender(gender: Gender, male: (f64, f64), female: (f64, f64)) -> Self {
        Self {
            min: gender.select(male.0, female.0),
            max: gender.select(male.1, female.1),
        }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

/// A constrained ratio `numerator : denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioPair {
    ChestToWaist,
    HipsToWaist,
    ShoulderToChest,
    ThighToHips,
    CalfToThigh,
    NeckToChest,
}

impl RatioPair {
    /// Correction order.
    pub const ORDER: [RatioPair; 6] = [
        RatioPair::ChestToWaist,
        RatioPair::HipsToWaist,
        RatioPair::ShoulderToChest,
        RatioPair::ThighToHips,
        RatioPair::CalfToThigh,
        RatioPair::NeckToChest,
    ];

    /// Pairs that move chest, thigh, neck or shoulder. Derived girths are
    /// computed after these and before [`RatioPair::DERIVED`].
    pub const SOURCES: [RatioPair; 5] = [
        RatioPair::ChestToWaist,
        RatioPair::HipsToWaist,
        RatioPair::ShoulderToChest,
        RatioPair::ThighToHips,
        RatioPair::NeckToChest,
    ];

    /// Pairs whose numerator is itself a derived girth.
    pub const DERIVED: [RatioPair; 1] = [RatioPair::CalfToThigh];

    pub const fn keys(&self) -> (MeasurementKey, MeasurementKey) {
        match self {
            RatioPair::ChestToWaist => (MeasurementKey::Chest, MeasurementKey::Waist),
            RatioPair::HipsToWaist => (MeasurementKey::Hips, MeasurementKey::Waist),
            RatioPair::ShoulderToChest => (MeasurementKey::Shoulder, MeasurementKey::Chest),
            RatioPair::ThighToHips => (MeasurementKey::Thigh, MeasurementKey::Hips),
            RatioPair::CalfToThigh => (MeasurementKey::Calf, MeasurementKey::Thigh),
            RatioPair::NeckToChest => (MeasurementKey::Neck, MeasurementKey::Chest),
        }
    }

    /// Two-sided pairs adjust both measurements; the rest only the numerator.
    pub const fn is_two_sided(&self) -> bool {
        matches!(self, RatioPair::ChestToWaist | RatioPair::HipsToWaist)
    }

    pub fn bounds(&self, gender: Gender, precision: PrecisionMode) -> RatioBounds {
        match self {
            RatioPair::ChestToWaist => RatioBounds::for_gender(gender, (1.12, 1.28), (1.08, 1.22)),
            RatioPair::HipsToWaist => match precision {
                PrecisionMode::Standard => {
                    RatioBounds::for_gender(gender, (1.05, 1.18), (1.10, 1.28))
                }
                PrecisionMode::HighPrecision => {
                    RatioBounds::for_gender(gender, (1.05, 1.13), (1.08, 1.30))
                }
            },
            RatioPair::ShoulderToChest => {
                RatioBounds::for_gender(gender, (0.43, 0.48), (0.40, 0.45))
            }
            RatioPair::ThighToHips => RatioBounds::for_gender(gender, (0.52, 0.62), (0.55, 0.64)),
            RatioPair::CalfToThigh => RatioBounds::for_gender(gender, (0.60, 0.80), (0.58, 0.78)),
            RatioPair::NeckToChest => RatioBounds::for_gender(gender, (0.35, 0.42), (0.30, 0.38)),
        }
    }
}

impl fmt::Display for RatioPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.keys();
        write!(f, "{a}:{b}")
    }
}

/// A ratio left outside its bounds after correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioViolation {
    pub pair: RatioPair,
    pub ratio: f64,
    pub bounds: RatioBounds,
}

impl fmt::Display for RatioViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ratio {:.3} outside [{:.2}, {:.2}]",
            self.pair, self.ratio, self.bounds.min, self.bounds.max
        )
    }
}

/// Weighted average of numerator and denominator kept fixed by two-sided corrections.
const NUMERATOR_WEIGHT: f64 = 0.6;
const DENOMINATOR_WEIGHT: f64 = 0.4;

/// Tolerance for reporting residual violations.
const RATIO_EPSILON: f64 = 1e-9;

/// Maximum passes when iterating to convergence.
const MAX_PASSES: usize = 8;

/// Move `(a, b)` onto `a / b = target`, keeping `0.6·a + 0.4·b` unchanged.
pub fn pull_to_ratio(a: f64, b: f64, target: f64) -> (f64, f64) {
    let avg = a * NUMERATOR_WEIGHT + b * DENOMINATOR_WEIGHT;
    let a_new = avg * target / (NUMERATOR_WEIGHT * target + DENOMINATOR_WEIGHT);
    (a_new, a_new / target)
}

/// Enforces pairwise anatomical ratio bounds on a measurement set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintCorrector {
    gender: Gender,
    precision: PrecisionMode,
    variant: Option<ModelVariant>,
    iterate_to_convergence: bool,
}

impl ConstraintCorrector {
    pub fn new(gender: Gender, precision: PrecisionMode) -> Self {
        Self {
            gender,
            precision,
            variant: None,
            iterate_to_convergence: false,
        }
    }

    /// The neck:chest pair only applies to variants that report neck circumference.
    pub fn with_variant(mut self, variant: ModelVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn iterate_to_convergence(mut self, iterate: bool) -> Self {
        self.iterate_to_convergence = iterate;
        self
    }

    fn applies(&self, pair: RatioPair) -> bool {
        match pair {
            RatioPair::NeckToChest => self
                .variant
                .is_some_and(|v| v.has_extended_measurements()),
            _ => true,
        }
    }

    pub fn bounds(&self, pair: RatioPair) -> RatioBounds {
        pair.bounds(self.gender, self.precision)
    }

    /// Correct `set` in place and return the pairs that were adjusted, in order.
    pub fn correct(&self, set: &mut MeasurementSet) -> Vec<RatioPair> {
        self.correct_pairs(set, &RatioPair::ORDER)
    }

    /// Like [`correct`](Self::correct), restricted to `pairs` in the given order.
    pub fn correct_pairs(&self, set: &mut MeasurementSet, pairs: &[RatioPair]) -> Vec<RatioPair> {
        let mut adjusted = self.correct_once(set, pairs);
        if self.iterate_to_convergence {
            for _ in 1..MAX_PASSES {
                let pass = self.correct_once(set, pairs);
                if pass.is_empty() {
                    break;
                }
                adjusted.extend(pass);
            }
        }
        adjusted
    }

    fn correct_once(&self, set: &mut MeasurementSet, pairs: &[RatioPair]) -> Vec<RatioPair> {
        let mut adjusted = Vec::new();
        for &pair in pairs {
            if self.applies(pair) && self.correct_pair(set, pair) {
                adjusted.push(pair);
            }
        }
        adjusted
    }

    /// Apply the correction for a single pair. Returns true if anything changed.
    pub fn correct_pair(&self, set: &mut MeasurementSet, pair: RatioPair) -> bool {
        let (ka, kb) = pair.keys();
        let (Some(a), Some(b)) = (set.get(ka), set.get(kb)) else {
            return false;
        };
        if a <= 0.0 || b <= 0.0 {
            return false;
        }

        let bounds = self.bounds(pair);
        let ratio = a / b;
        let target = if ratio < bounds.min {
            bounds.min
        } else if ratio > bounds.max {
            bounds.max
        } else {
            return false;
        };

        if pair.is_two_sided() {
            let (a_new, b_new) = pull_to_ratio(a, b, target);
            set.insert(ka, a_new);
            set.insert(kb, b_new);
        } else {
            set.insert(ka, b * target);
        }
        debug!(%pair, ratio, target, "ratio corrected");
        true
    }

    /// Ratios that are still outside their bounds.
    pub fn check(&self, set: &MeasurementSet) -> Vec<RatioViolation> {
        let mut violations = Vec::new();
        for pair in RatioPair::ORDER {
            if !self.applies(pair) {
                continue;
            }
            let (ka, kb) = pair.keys();
            let (Some(a), Some(b)) = (set.get(ka), set.get(kb)) else {
                continue;
            };
            if b <= 0.0 {
                continue;
            }
            let ratio = a / b;
            let bounds = self.bounds(pair);
            if ratio < bounds.min - RATIO_EPSILON || ratio > bounds.max + RATIO_EPSILON {
                let violation = RatioViolation {
                    pair,
                    ratio,
                    bounds,
                };
                warn!(%violation, "inconsistent measurement after correction");
                violations.push(violation);
            }
        }
        violations
    }
}

/// Clamp each proportional measurement into its height-fraction window.
///
/// Returns the keys that were clamped.
pub fn clamp_to_height_windows(set: &mut MeasurementSet, gender: Gender) -> Vec<MeasurementKey> {
    let Some(height) = set.height() else {
        return Vec::new();
    };
    let mut clamped = Vec::new();
    let keys: Vec<MeasurementKey> = set.keys().collect();
    for key in keys {
        let (Some(window), Some(value)) = (height_window(key, gender), set.get(key)) else {
            continue;
        };
        let lo = height * window.min_fraction;
        let hi = height * window.max_fraction;
        if value < lo || value > hi {
            set.insert(key, value.clamp(lo, hi));
            clamped.push(key);
        }
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(set: &MeasurementSet, pair: RatioPair) -> f64 {
        let (a, b) = pair.keys();
        set.get(a).unwrap() / set.get(b).unwrap()
    }

    #[test]
    fn pull_preserves_weighted_average() {
        let (a, b) = pull_to_ratio(90.0, 85.0, 1.12);
        assert!((a / b - 1.12).abs() < 1e-12);
        assert!((a * 0.6 + b * 0.4 - (90.0 * 0.6 + 85.0 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn chest_waist_below_min() {
        let corrector = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard);
        let mut set = MeasurementSet::from([
            (MeasurementKey::Chest, 90.0),
            (MeasurementKey::Waist, 85.0),
        ]);
        let adjusted = corrector.correct(&mut set);
        assert_eq!(adjusted, vec![RatioPair::ChestToWaist]);

        // avg = 54 + 34 = 88; chest = 88 * 1.12 / (0.672 + 0.4)
        let chest = 88.0 * 1.12 / (0.6 * 1.12 + 0.4);
        assert!((set.get(MeasurementKey::Chest).unwrap() - chest).abs() < 1e-9);
        assert!((set.get(MeasurementKey::Waist).unwrap() - chest / 1.12).abs() < 1e-9);
    }

    #[test]
    fn chest_waist_above_max() {
        let corrector = ConstraintCorrector::new(Gender::Female, PrecisionMode::Standard);
        let mut set = MeasurementSet::from([
            (MeasurementKey::Chest, 100.0),
            (MeasurementKey::Waist, 70.0),
        ]);
        corrector.correct(&mut set);
        assert!((ratio(&set, RatioPair::ChestToWaist) - 1.22).abs() < 1e-12);
    }

    #[test]
    fn in_bounds_is_untouched() {
        let corrector = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard);
        let original = MeasurementSet::from([
            (MeasurementKey::Chest, 95.0),
            (MeasurementKey::Waist, 80.0),
            (MeasurementKey::Hips, 92.0),
            (MeasurementKey::Shoulder, 44.0),
            (MeasurementKey::Thigh, 55.0),
        ]);
        let mut set = original.clone();
        assert!(corrector.correct(&mut set).is_empty());
        assert_eq!(set, original);
    }

    #[test]
    fn single_sided_moves_numerator_only() {
        let corrector = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard);
        let mut set = MeasurementSet::from([
            (MeasurementKey::Chest, 100.0),
            (MeasurementKey::Waist, 85.0),
            (MeasurementKey::Shoulder, 55.0),
        ]);
        corrector.correct(&mut set);
        assert_eq!(set.get(MeasurementKey::Chest), Some(100.0));
        assert!((set.get(MeasurementKey::Shoulder).unwrap() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn neck_pair_depends_on_variant() {
        let set = MeasurementSet::from([
            (MeasurementKey::Chest, 100.0),
            (MeasurementKey::Waist, 85.0),
            (MeasurementKey::Neck, 30.0),
        ]);

        let mut plain = set.clone();
        ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard)
            .with_variant(ModelVariant::Smpl)
            .correct(&mut plain);
        assert_eq!(plain.get(MeasurementKey::Neck), Some(30.0));

        let mut extended = set;
        ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard)
            .with_variant(ModelVariant::Sizer)
            .correct(&mut extended);
        assert!((extended.get(MeasurementKey::Neck).unwrap() - 35.0).abs() < 1e-9);
    }

    #[test]
    fn calf_pair_needs_both_values() {
        let corrector = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard);
        let mut set = MeasurementSet::from([(MeasurementKey::Calf, 90.0)]);
        assert!(corrector.correct(&mut set).is_empty());
    }

    #[test]
    fn precision_modes_select_hips_table() {
        let std = RatioPair::HipsToWaist.bounds(Gender::Male, PrecisionMode::Standard);
        let high = RatioPair::HipsToWaist.bounds(Gender::Male, PrecisionMode::HighPrecision);
        assert_eq!(std, RatioBounds::new(1.05, 1.18));
        assert_eq!(high, RatioBounds::new(1.05, 1.13));

        let female_high = RatioPair::HipsToWaist.bounds(Gender::Female, PrecisionMode::HighPrecision);
        assert_eq!(female_high, RatioBounds::new(1.08, 1.30));
    }

    #[test]
    fn single_pass_can_leave_residual_violation() {
        // chest:waist passes first, then hips:waist grows the waist and
        // drops chest:waist below its minimum.
        let corrector = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard);
        let mut set = MeasurementSet::from([
            (MeasurementKey::Chest, 102.0),
            (MeasurementKey::Waist, 80.0),
            (MeasurementKey::Hips, 120.0),
        ]);
        corrector.correct(&mut set);
        assert!((ratio(&set, RatioPair::HipsToWaist) - 1.18).abs() < 1e-9);

        let violations = corrector.check(&set);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].pair, RatioPair::ChestToWaist);
        assert!(violations[0].to_string().contains("chest:waist"));
    }

    #[test]
    fn iteration_shrinks_residual_violation() {
        let start = MeasurementSet::from([
            (MeasurementKey::Chest, 102.0),
            (MeasurementKey::Waist, 80.0),
            (MeasurementKey::Hips, 120.0),
        ]);

        let single = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard);
        let mut once = start.clone();
        single.correct(&mut once);

        let iterating = single.iterate_to_convergence(true);
        let mut many = start;
        let adjusted = iterating.correct(&mut many);
        assert!(adjusted.len() > 2);

        let gap_once = 1.12 - ratio(&once, RatioPair::ChestToWaist);
        let gap_many = 1.12 - ratio(&many, RatioPair::ChestToWaist);
        assert!(gap_many < gap_once / 10.0);
        assert!((ratio(&many, RatioPair::HipsToWaist) - 1.18).abs() < 1e-9);
    }

    #[test]
    fn staged_correction_matches_full_pass() {
        let corrector = ConstraintCorrector::new(Gender::Male, PrecisionMode::Standard)
            .with_variant(ModelVariant::SmplX);
        let start = MeasurementSet::from([
            (MeasurementKey::Chest, 100.0),
            (MeasurementKey::Waist, 95.0),
            (MeasurementKey::Hips, 99.0),
            (MeasurementKey::Shoulder, 60.0),
            (MeasurementKey::Thigh, 70.0),
            (MeasurementKey::Calf, 65.0),
            (MeasurementKey::Neck, 50.0),
        ]);

        let mut full = start.clone();
        let full_pairs = corrector.correct(&mut full);

        let mut staged = start;
        let mut staged_pairs = corrector.correct_pairs(&mut staged, &RatioPair::SOURCES);
        staged_pairs.extend(corrector.correct_pairs(&mut staged, &RatioPair::DERIVED));

        assert_eq!(full, staged);
        assert!(staged_pairs.contains(&RatioPair::NeckToChest));
        assert!(staged_pairs.contains(&RatioPair::CalfToThigh));
        assert_eq!(full_pairs.len(), staged_pairs.len());
    }

    #[test]
    fn height_window_clamp() {
        let mut set = MeasurementSet::from([
            (MeasurementKey::Height, 180.0),
            (MeasurementKey::Chest, 200.0),
            (MeasurementKey::Waist, 80.0),
            (MeasurementKey::ShoulderWidth, 300.0),
        ]);
        let clamped = clamp_to_height_windows(&mut set, Gender::Male);
        assert_eq!(clamped, vec![MeasurementKey::Chest]);
        assert!((set.get(MeasurementKey::Chest).unwrap() - 180.0 * 0.60).abs() < 1e-9);
        assert_eq!(set.get(MeasurementKey::Height), Some(180.0));
        // No window for shoulderWidth: left as is.
        assert_eq!(set.get(MeasurementKey::ShoulderWidth), Some(300.0));
    }
}
