//! Height and landmarks to a full, anatomically consistent measurement set.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::{ConstraintCorrector, RatioPair, RatioViolation};
use crate::error::{Error, Result};
use crate::landmarks::LandmarkSet;
use crate::proportions::{scale_factor, standard_height, statistical_estimate};
use crate::random::RandomSource;
use crate::refine::{apply_front_pass, apply_side_pass, LandmarkWeights};
use crate::types::{
    Gender, MeasurementKey, MeasurementSet, MeasurementSystem, ModelVariant, PrecisionMode,
    MAX_HEIGHT_CM, MIN_HEIGHT_CM,
};

/// Reject heights that are not finite or fall outside the supported range.
pub fn validate_height(height_cm: f64) -> Result<f64> {
    if height_cm.is_finite() && (MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&height_cm) {
        Ok(height_cm)
    } else {
        Err(Error::InvalidHeight { value: height_cm })
    }
}

/// Landmarks detected in the front and (optionally) side photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkInput {
    #[serde(default)]
    pub front: Option<LandmarkSet>,
    #[serde(default)]
    pub side: Option<LandmarkSet>,
}

impl LandmarkInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn front(front: LandmarkSet) -> Self {
        Self {
            front: Some(front),
            side: None,
        }
    }

    pub fn with_side(mut self, side: LandmarkSet) -> Self {
        self.side = Some(side);
        self
    }

    pub fn has_side_view(&self) -> bool {
        self.side.is_some()
    }
}

/// Result of one estimation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyEstimate {
    pub measurements: MeasurementSet,
    pub confidence: f64,
    pub model_variant: ModelVariant,
    /// Keys that received landmark input.
    pub refined: Vec<MeasurementKey>,
    /// Ratio pairs adjusted by the constraint corrector.
    pub corrections: Vec<RatioPair>,
    /// Ratios still outside their bounds after correction.
    pub warnings: Vec<RatioViolation>,
}

/// Measurement estimator for one subject profile.
#[derive(Debug, Clone)]
pub struct Estimator {
    gender: Gender,
    variant: ModelVariant,
    system: MeasurementSystem,
    weights: LandmarkWeights,
    corrector: ConstraintCorrector,
}

impl Estimator {
    pub fn builder() -> EstimatorBuilder {
        EstimatorBuilder::new()
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn model_variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn measurement_system(&self) -> MeasurementSystem {
        self.system
    }

    /// Primary measurements from height alone, scaled for the body model.
    pub fn model_scaled<R: RandomSource + ?Sized>(
        &self,
        height_cm: f64,
        rng: &mut R,
    ) -> Result<MeasurementSet> {
        let height_scale = height_cm / standard_height(self.gender);
        debug!(height_cm, height_scale, gender = %self.gender, variant = %self.variant, "model scaling");

        let mut set = statistical_estimate(height_cm, self.gender);
        for key in MeasurementKey::PRIMARY {
            let factor = scale_factor(key, self.gender, self.variant, height_scale, rng)?;
            set.scale(key, factor);
        }
        Ok(set)
    }

    /// Run the full pipeline. `height` is in the estimator's measurement system.
    pub fn estimate<R: RandomSource + ?Sized>(
        &self,
        height: f64,
        landmarks: &LandmarkInput,
        rng: &mut R,
    ) -> Result<BodyEstimate> {
        let height_cm = validate_height(self.system.to_cm(height))?;
        let mut set = self.model_scaled(height_cm, rng)?;

        let mut refined = Vec::new();
        if let Some(front) = &landmarks.front {
            refined.extend(apply_front_pass(&mut set, front, height_cm, &self.weights));
        }
        if let Some(side) = &landmarks.side {
            let side_keys = apply_side_pass(
                &mut set,
                landmarks.front.as_ref(),
                side,
                height_cm,
                &self.weights,
            );
            for key in side_keys {
                if !refined.contains(&key) {
                    refined.push(key);
                }
            }
        }

        // Girths derive from the corrected chest, thigh, neck and shoulder.
        let mut corrections = self.corrector.correct_pairs(&mut set, &RatioPair::SOURCES);
        self.derive_secondary(&mut set);
        corrections.extend(self.corrector.correct_pairs(&mut set, &RatioPair::DERIVED));
        let warnings = self.corrector.check(&set);

        set.insert(MeasurementKey::Height, height_cm);

        let confidence = self.confidence(landmarks.has_side_view(), rng);
        debug!(confidence, corrections = corrections.len(), "estimate complete");

        Ok(BodyEstimate {
            measurements: set,
            confidence,
            model_variant: self.variant,
            refined,
            corrections,
            warnings,
        })
    }

    fn accuracy_factor(&self) -> f64 {
        let base = match self.variant {
            ModelVariant::Smpl => 1.02,
            ModelVariant::SmplX => 1.06,
            ModelVariant::Star => 1.03,
            ModelVariant::Pare => 1.05,
            ModelVariant::Spin => 1.04,
            ModelVariant::Sizer => 1.07,
        };
        base * self.gender.select(1.0, 1.01)
    }

    /// Limb girths from chest and thigh, plus the extended keys for SMPL-X and SIZER.
    fn derive_secondary(&self, set: &mut MeasurementSet) {
        let extended = self.variant.has_extended_measurements();
        let arm_adjustment = if extended { 1.02 } else { 1.0 };
        let factor = arm_adjustment * self.accuracy_factor();
        let g = self.gender;

        if let Some(chest) = set.get(MeasurementKey::Chest) {
            set.insert(MeasurementKey::UpperArm, chest * g.select(0.325, 0.305) * factor);
            set.insert(MeasurementKey::Forearm, chest * g.select(0.265, 0.245) * factor);
        }
        if let Some(thigh) = set.get(MeasurementKey::Thigh) {
            set.insert(MeasurementKey::Calf, thigh * g.select(0.74, 0.715) * factor);
        }

        if extended {
            if let Some(neck) = set.get(MeasurementKey::Neck) {
                set.insert(MeasurementKey::NeckCircumference, neck * g.select(1.12, 1.10));
            }
            if let Some(shoulder) = set.get(MeasurementKey::Shoulder) {
                set.insert(MeasurementKey::ShoulderWidth, shoulder * g.select(1.05, 1.04));
            }
        }
    }

    fn confidence<R: RandomSource + ?Sized>(&self, side_view: bool, rng: &mut R) -> f64 {
        let base = match self.variant {
            ModelVariant::Smpl => 0.89,
            ModelVariant::SmplX => 0.94,
            ModelVariant::Star => 0.90,
            ModelVariant::Pare => 0.92,
            ModelVariant::Spin => 0.91,
            ModelVariant::Sizer => 0.95,
        };
        let side_bonus = if side_view { 0.05 } else { 0.0 };
        let gender_bonus = if self.gender == Gender::Male { 0.01 } else { 0.0 };
        let variation = (rng.next_f64() - 0.5) * 0.005;
        (base + side_bonus + gender_bonus + variation).min(0.99)
    }
}

/// Builder for an [`Estimator`].
pub struct EstimatorBuilder {
    gender: Option<Gender>,
    variant: ModelVariant,
    precision: PrecisionMode,
    system: MeasurementSystem,
    weights: LandmarkWeights,
    iterate_to_convergence: bool,
}

impl EstimatorBuilder {
    pub fn new() -> Self {
        Self {
            gender: None,
            variant: ModelVariant::Smpl,
            precision: PrecisionMode::Standard,
            system: MeasurementSystem::Metric,
            weights: LandmarkWeights::default(),
            iterate_to_convergence: false,
        }
    }

    /// Set the gender category. Required.
    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn model_variant(mut self, variant: ModelVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn precision(mut self, precision: PrecisionMode) -> Self {
        self.precision = precision;
        self
    }

    /// Unit system of the height passed to [`Estimator::estimate`].
    pub fn measurement_system(mut self, system: MeasurementSystem) -> Self {
        self.system = system;
        self
    }

    pub fn landmark_weights(mut self, weights: LandmarkWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Repeat the constraint pass until nothing changes (at most 8 passes).
    pub fn iterate_to_convergence(mut self, iterate: bool) -> Self {
        self.iterate_to_convergence = iterate;
        self
    }

    pub fn build(self) -> Result<Estimator> {
        let gender = self
            .gender
            .ok_or_else(|| Error::invalid_params("missing gender"))?;
        self.weights.validate()?;

        let corrector = ConstraintCorrector::new(gender, self.precision)
            .with_variant(self.variant)
            .iterate_to_convergence(self.iterate_to_convergence);

        Ok(Estimator {
            gender,
            variant: self.variant,
            system: self.system,
            weights: self.weights,
            corrector,
        })
    }
}

impl Default for EstimatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConstantSource;
    use crate::types::LandmarkPoint;
    use crate::landmarks::Joint;

    fn male_smpl() -> Estimator {
        Estimator::builder().gender(Gender::Male).build().unwrap()
    }

    #[test]
    fn builder_requires_gender() {
        let err = EstimatorBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn builder_rejects_bad_weights() {
        let weights = LandmarkWeights {
            side_view: -0.1,
            ..LandmarkWeights::default()
        };
        let result = Estimator::builder()
            .gender(Gender::Female)
            .landmark_weights(weights)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn height_validation() {
        assert!(validate_height(100.0).is_ok());
        assert!(validate_height(220.0).is_ok());
        assert!(validate_height(99.9).is_err());
        assert!(validate_height(f64::NAN).is_err());
        assert!(validate_height(f64::INFINITY).is_err());
    }

    #[test]
    fn imperial_height_is_converted() {
        let estimator = Estimator::builder()
            .gender(Gender::Male)
            .measurement_system(MeasurementSystem::Imperial)
            .build()
            .unwrap();
        let mut rng = ConstantSource::midpoint();
        let estimate = estimator.estimate(70.0, &LandmarkInput::none(), &mut rng).unwrap();
        let height = estimate.measurements.height().unwrap();
        assert!((height - 177.8).abs() < 1e-9);

        // 30 inches is 76.2 cm: rejected after conversion.
        assert!(estimator.estimate(30.0, &LandmarkInput::none(), &mut rng).is_err());
    }

    #[test]
    fn model_scaled_chest_for_reference_male() {
        let mut rng = ConstantSource::midpoint();
        let set = male_smpl().model_scaled(180.0, &mut rng).unwrap();
        // 180 / 175 = 1.0286 sits in the middle height bucket.
        let expected = 0.52 * 180.0 * 1.015 * 1.00 * 1.00;
        assert!((set.get(MeasurementKey::Chest).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn reference_male_estimate_is_consistent() {
        let mut rng = ConstantSource::midpoint();
        let estimate = male_smpl()
            .estimate(180.0, &LandmarkInput::none(), &mut rng)
            .unwrap();
        let m = &estimate.measurements;

        assert_eq!(m.height(), Some(180.0));
        let ratio = m.get(MeasurementKey::Chest).unwrap() / m.get(MeasurementKey::Waist).unwrap();
        assert!((1.12..=1.28).contains(&ratio));
        assert!(m.is_physical());
        assert!(estimate.warnings.is_empty());
        assert!(estimate.refined.is_empty());
        assert!(!m.contains(MeasurementKey::NeckCircumference));

        // base 0.89 + male 0.01, no side view, no variation at the midpoint
        assert!((estimate.confidence - 0.90).abs() < 1e-12);
    }

    #[test]
    fn secondary_measurements_follow_chest_and_thigh() {
        let mut rng = ConstantSource::midpoint();
        let estimate = male_smpl()
            .estimate(180.0, &LandmarkInput::none(), &mut rng)
            .unwrap();
        let m = &estimate.measurements;
        let chest = m.get(MeasurementKey::Chest).unwrap();
        let thigh = m.get(MeasurementKey::Thigh).unwrap();

        assert!((m.get(MeasurementKey::UpperArm).unwrap() - chest * 0.325 * 1.02).abs() < 1e-9);
        assert!((m.get(MeasurementKey::Forearm).unwrap() - chest * 0.265 * 1.02).abs() < 1e-9);
        assert!((m.get(MeasurementKey::Calf).unwrap() - thigh * 0.74 * 1.02).abs() < 1e-9);
    }

    fn wide_shoulders() -> LandmarkInput {
        let front: LandmarkSet = [
            (Joint::LeftShoulder, LandmarkPoint::new(0.2, 0.32, 0.0)),
            (Joint::RightShoulder, LandmarkPoint::new(-0.2, 0.32, 0.0)),
        ]
        .into_iter()
        .collect();
        LandmarkInput::front(front)
    }

    #[test]
    fn secondary_measurements_follow_corrected_values() {
        let mut rng = ConstantSource::midpoint();
        let estimate = male_smpl().estimate(180.0, &wide_shoulders(), &mut rng).unwrap();
        assert!(estimate.corrections.contains(&RatioPair::ShoulderToChest));

        let m = &estimate.measurements;
        let chest = m.get(MeasurementKey::Chest).unwrap();
        let thigh = m.get(MeasurementKey::Thigh).unwrap();
        assert!((m.get(MeasurementKey::UpperArm).unwrap() - chest * 0.325 * 1.02).abs() < 1e-9);
        assert!((m.get(MeasurementKey::Forearm).unwrap() - chest * 0.265 * 1.02).abs() < 1e-9);
        assert!((m.get(MeasurementKey::Calf).unwrap() - thigh * 0.74 * 1.02).abs() < 1e-9);
    }

    #[test]
    fn extended_keys_follow_corrected_neck_and_shoulder() {
        let estimator = Estimator::builder()
            .gender(Gender::Male)
            .model_variant(ModelVariant::SmplX)
            .build()
            .unwrap();
        let mut rng = ConstantSource::midpoint();
        let estimate = estimator.estimate(180.0, &wide_shoulders(), &mut rng).unwrap();
        assert!(!estimate.corrections.is_empty());

        let m = &estimate.measurements;
        let neck = m.get(MeasurementKey::Neck).unwrap();
        let shoulder = m.get(MeasurementKey::Shoulder).unwrap();
        assert!((m.get(MeasurementKey::NeckCircumference).unwrap() - neck * 1.12).abs() < 1e-9);
        assert!((m.get(MeasurementKey::ShoulderWidth).unwrap() - shoulder * 1.05).abs() < 1e-9);
    }

    #[test]
    fn extended_variants_add_keys() {
        let estimator = Estimator::builder()
            .gender(Gender::Female)
            .model_variant(ModelVariant::SmplX)
            .build()
            .unwrap();
        let mut rng = ConstantSource::midpoint();
        let estimate = estimator
            .estimate(165.0, &LandmarkInput::none(), &mut rng)
            .unwrap();
        let m = &estimate.measurements;
        assert!(m.contains(MeasurementKey::NeckCircumference));
        assert!(m.contains(MeasurementKey::ShoulderWidth));
        assert_eq!(estimate.model_variant, ModelVariant::SmplX);
    }

    #[test]
    fn side_view_raises_confidence() {
        let side: LandmarkSet = [
            (Joint::LeftShoulder, LandmarkPoint::new(0.0, 0.32, 0.06)),
            (Joint::RightShoulder, LandmarkPoint::new(0.0, 0.32, -0.06)),
        ]
        .into_iter()
        .collect();
        let input = LandmarkInput::none().with_side(side);

        let estimator = Estimator::builder()
            .gender(Gender::Male)
            .model_variant(ModelVariant::Sizer)
            .build()
            .unwrap();
        let mut rng = ConstantSource::midpoint();
        let estimate = estimator.estimate(180.0, &input, &mut rng).unwrap();
        assert!((estimate.confidence - 0.99).abs() < 1e-12);
        assert_eq!(estimate.refined, vec![MeasurementKey::Chest]);
    }

    #[test]
    fn missing_landmarks_change_nothing() {
        let estimator = male_smpl();
        let plain = estimator
            .estimate(175.0, &LandmarkInput::none(), &mut ConstantSource::midpoint())
            .unwrap();
        let empty = estimator
            .estimate(
                175.0,
                &LandmarkInput::front(LandmarkSet::new()),
                &mut ConstantSource::midpoint(),
            )
            .unwrap();
        assert_eq!(plain.measurements, empty.measurements);
    }
}
