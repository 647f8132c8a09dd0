//! # body-measure
//!
//! Anatomically constrained body measurement synthesis.
//!
//! This crate provides:
//! - **Estimation**: a full measurement set from a height, a gender category and
//!   optional pose landmarks, scaled for one of six named body models
//! - **Constraint correction**: pairwise ratio bounds (chest:waist, hips:waist,
//!   shoulder:chest, thigh:hips, calf:thigh, neck:chest) enforced in a fixed order
//! - **Synthetic datasets**: plausible ground-truth samples with weights and landmarks
//! - **Evaluation**: MAE and percentage deviation of a candidate against a dataset,
//!   with a CSV report and clothing size recommendations
//!
//! ## Pipeline
//!
//! 1. Height-proportional statistical estimate of the primary measurements
//! 2. Scale factor per measurement (gender table × model adjustment × height bucket × jitter)
//! 3. Front-view landmark pass, then side-view pass, each blended with fixed weights
//! 4. Derived limb girths and extended measurements
//! 5. Single-pass constraint correction, followed by a diagnostic re-check
//!
//! Every random draw comes from an injected [`RandomSource`], so a seeded
//! generator or a [`ConstantSource`] makes results reproducible.
//!
//! ## Quick Start
//!
//! ```rust
//! use body_measure::{ConstantSource, Estimator, Gender, LandmarkInput, MeasurementKey};
//!
//! let estimator = Estimator::builder()
//!     .gender(Gender::Male)
//!     .build()
//!     .unwrap();
//!
//! let mut rng = ConstantSource::midpoint();
//! let estimate = estimator
//!     .estimate(180.0, &LandmarkInput::none(), &mut rng)
//!     .unwrap();
//!
//! let chest = estimate.measurements.get(MeasurementKey::Chest).unwrap();
//! let waist = estimate.measurements.get(MeasurementKey::Waist).unwrap();
//! assert!((1.12..=1.28).contains(&(chest / waist)));
//! ```
//!
//! ## Evaluating Against a Synthetic Dataset
//!
//! ```rust
//! use body_measure::{
//!     evaluate, generate_dataset, AccuracyLevel, DatasetParams, EvaluationParams,
//!     MeasurementKey, MeasurementSet,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let dataset = generate_dataset(&DatasetParams::with_samples(5, AccuracyLevel::High), &mut rng)
//!     .unwrap();
//!
//! let candidate = MeasurementSet::from([
//!     (MeasurementKey::Chest, 95.0),
//!     (MeasurementKey::Waist, 80.0),
//! ]);
//! let result = evaluate(&candidate, &dataset, &EvaluationParams::default()).unwrap();
//! println!("MAE {:.2} cm over {} samples", result.mae, result.sample_count);
//! ```

pub mod backend;
mod constraints;
mod dataset;
mod error;
mod estimator;
pub mod landmarks;
mod metrics;
pub mod proportions;
mod random;
mod refine;
mod report;
mod sizing;
mod types;

pub use backend::{
    BackendRequest, MeasurementBackend, MeasurementOutcome, MeasurementService,
    MeasurementSource, Photos, PoseDetector,
};
pub use constraints::{
    clamp_to_height_windows, pull_to_ratio, ConstraintCorrector, RatioBounds, RatioPair,
    RatioViolation,
};
pub use dataset::{
    generate_dataset, generate_sample, Dataset, DatasetParams, DatasetSample, ShapeFactors,
};
pub use error::{Error, Result};
pub use estimator::{validate_height, BodyEstimate, Estimator, EstimatorBuilder, LandmarkInput};
pub use landmarks::{Joint, LandmarkSet, PoseLandmarks};
pub use metrics::{
    evaluate, AccuracyAnalysis, EmptyOverlapPolicy, EvaluationParams, EvaluationResult,
    KeyMeasurement,
};
pub use random::{ConstantSource, RandomSource};
pub use refine::{blend, LandmarkWeights};
pub use report::{AccuracyRating, CsvReport};
pub use sizing::{recommend_sizes, ClothingSize, SizeRecommendation};
pub use types::{
    AccuracyLevel, Gender, LandmarkPoint, MeasurementKey, MeasurementSet, MeasurementSystem,
    ModelVariant, PrecisionMode, CM_PER_INCH, MAX_HEIGHT_CM, MIN_HEIGHT_CM,
};
