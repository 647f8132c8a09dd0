//! External collaborators and the service that combines them with local synthesis.
//!
//! Pose detection and the remote measurement backend are opaque. Both are
//! injected through traits; [`MeasurementService`] falls back to the local
//! [`Estimator`] whenever the backend fails or returns unusable values.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constraints::RatioViolation;
use crate::error::Result;
use crate::estimator::{validate_height, Estimator, LandmarkInput};
use crate::landmarks::{LandmarkSet, PoseLandmarks};
use crate::random::RandomSource;
use crate::types::{Gender, MeasurementKey, MeasurementSet, MeasurementSystem};

/// Payload sent to the measurement backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRequest {
    pub gender: Gender,
    /// Height in `measurement_system` units, as entered.
    pub height: f64,
    pub measurement_system: MeasurementSystem,
    pub front_image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_image_base64: Option<String>,
}

/// Backend response body, `{"measurements": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub measurements: MeasurementSet,
}

impl BackendResponse {
    /// Parse a response body into its measurement set.
    ///
    /// Unknown measurement keys are rejected.
    pub fn parse(body: &str) -> Result<MeasurementSet> {
        let response: BackendResponse = serde_json::from_str(body)?;
        Ok(response.measurements)
    }
}

/// Remote body-measurement service.
pub trait MeasurementBackend {
    fn estimate(&self, request: &BackendRequest) -> Result<MeasurementSet>;
}

/// Pose detector for a base64-encoded image. `Ok(None)` means no person was found.
pub trait PoseDetector {
    fn detect_pose(&self, image_base64: &str) -> Result<Option<PoseLandmarks>>;
}

impl<T: MeasurementBackend + ?Sized> MeasurementBackend for &T {
    fn estimate(&self, request: &BackendRequest) -> Result<MeasurementSet> {
        (**self).estimate(request)
    }
}

impl<T: PoseDetector + ?Sized> PoseDetector for &T {
    fn detect_pose(&self, image_base64: &str) -> Result<Option<PoseLandmarks>> {
        (**self).detect_pose(image_base64)
    }
}

/// Where a set of measurements came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSource {
    Backend,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementOutcome {
    pub measurements: MeasurementSet,
    pub source: MeasurementSource,
    /// Confidence of the local estimate; the backend does not report one.
    pub confidence: Option<f64>,
    pub landmarks: LandmarkInput,
    pub warnings: Vec<RatioViolation>,
}

/// Photos of the subject, base64-encoded.
#[derive(Debug, Clone, Copy)]
pub struct Photos<'a> {
    pub front: &'a str,
    pub side: Option<&'a str>,
}

pub struct MeasurementService<B, P> {
    estimator: Estimator,
    backend: B,
    detector: P,
}

impl<B: MeasurementBackend, P: PoseDetector> MeasurementService<B, P> {
    pub fn new(estimator: Estimator, backend: B, detector: P) -> Self {
        Self {
            estimator,
            backend,
            detector,
        }
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    fn detect(&self, view: &str, image: &str) -> Option<LandmarkSet> {
        match self.detector.detect_pose(image) {
            Ok(Some(pose)) => Some(LandmarkSet::from_pose(&pose)),
            Ok(None) => {
                debug!(view, "no pose detected");
                None
            }
            Err(e) => {
                warn!(view, error = %e, "pose detection failed");
                None
            }
        }
    }

    /// Detect poses, ask the backend, and fall back to local synthesis on failure.
    ///
    /// Only an invalid height is an error; every collaborator failure degrades.
    pub fn measure<R: RandomSource + ?Sized>(
        &self,
        height: f64,
        photos: Photos<'_>,
        rng: &mut R,
    ) -> Result<MeasurementOutcome> {
        let system = self.estimator.measurement_system();
        let height_cm = validate_height(system.to_cm(height))?;

        let landmarks = LandmarkInput {
            front: self.detect("front", photos.front),
            side: photos.side.and_then(|side| self.detect("side", side)),
        };

        let request = BackendRequest {
            gender: self.estimator.gender(),
            height,
            measurement_system: system,
            front_image_base64: photos.front.to_string(),
            side_image_base64: photos.side.map(str::to_string),
        };

        match self.backend.estimate(&request) {
            Ok(mut measurements) if measurements.is_physical() => {
                measurements.insert(MeasurementKey::Height, height_cm);
                return Ok(MeasurementOutcome {
                    measurements,
                    source: MeasurementSource::Backend,
                    confidence: None,
                    landmarks,
                    warnings: Vec::new(),
                });
            }
            Ok(_) => warn!("backend returned negative or non-finite values, using local estimate"),
            Err(e) => warn!(error = %e, "backend unavailable, using local estimate"),
        }

        let estimate = self.estimator.estimate(height, &landmarks, rng)?;
        Ok(MeasurementOutcome {
            measurements: estimate.measurements,
            source: MeasurementSource::Local,
            confidence: Some(estimate.confidence),
            landmarks,
            warnings: estimate.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::landmarks::Joint;
    use crate::random::ConstantSource;
    use crate::types::LandmarkPoint;
    use std::cell::RefCell;

    struct FixedBackend {
        result: Option<MeasurementSet>,
        seen: RefCell<Vec<BackendRequest>>,
    }

    impl FixedBackend {
        fn ok(set: MeasurementSet) -> Self {
            Self {
                result: Some(set),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: None,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl MeasurementBackend for FixedBackend {
        fn estimate(&self, request: &BackendRequest) -> Result<MeasurementSet> {
            self.seen.borrow_mut().push(request.clone());
            self.result
                .clone()
                .ok_or_else(|| Error::backend("connection refused"))
        }
    }

    /// Replays a raw response body.
    struct RecordedBackend(&'static str);

    impl MeasurementBackend for RecordedBackend {
        fn estimate(&self, _request: &BackendRequest) -> Result<MeasurementSet> {
            BackendResponse::parse(self.0)
        }
    }

    struct TemplatePose;

    impl PoseDetector for TemplatePose {
        fn detect_pose(&self, image_base64: &str) -> Result<Option<PoseLandmarks>> {
            if image_base64.is_empty() {
                return Ok(None);
            }
            let mut landmarks = vec![LandmarkPoint::new(0.0, 0.0, 0.0); 33];
            landmarks[5] = LandmarkPoint::new(0.11, 0.32, 0.0);
            landmarks[6] = LandmarkPoint::new(-0.11, 0.32, 0.0);
            Ok(Some(PoseLandmarks {
                landmarks,
                world_landmarks: None,
            }))
        }
    }

    struct BrokenPose;

    impl PoseDetector for BrokenPose {
        fn detect_pose(&self, _image_base64: &str) -> Result<Option<PoseLandmarks>> {
            Err(Error::backend("model not loaded"))
        }
    }

    fn estimator() -> Estimator {
        Estimator::builder().gender(Gender::Male).build().unwrap()
    }

    fn photos() -> Photos<'static> {
        Photos {
            front: "ZnJvbnQ=",
            side: None,
        }
    }

    #[test]
    fn backend_result_is_used_and_height_overwritten() {
        let remote = MeasurementSet::from([
            (MeasurementKey::Height, 150.0),
            (MeasurementKey::Chest, 98.0),
        ]);
        let backend = FixedBackend::ok(remote);
        let service = MeasurementService::new(estimator(), &backend, TemplatePose);

        let outcome = service
            .measure(182.0, photos(), &mut ConstantSource::midpoint())
            .unwrap();
        assert_eq!(outcome.source, MeasurementSource::Backend);
        assert_eq!(outcome.measurements.height(), Some(182.0));
        assert_eq!(outcome.measurements.get(MeasurementKey::Chest), Some(98.0));
        assert!(outcome.confidence.is_none());

        let seen = backend.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].front_image_base64, "ZnJvbnQ=");
        assert!(outcome.landmarks.front.as_ref().unwrap().contains(Joint::Neck));
    }

    #[test]
    fn backend_failure_falls_back() {
        let service = MeasurementService::new(estimator(), FixedBackend::failing(), TemplatePose);
        let outcome = service
            .measure(180.0, photos(), &mut ConstantSource::midpoint())
            .unwrap();
        assert_eq!(outcome.source, MeasurementSource::Local);
        assert!(outcome.confidence.is_some());
        assert!(outcome.measurements.contains(MeasurementKey::Chest));
        assert_eq!(outcome.measurements.height(), Some(180.0));
    }

    #[test]
    fn non_physical_backend_values_fall_back() {
        let remote = MeasurementSet::from([(MeasurementKey::Chest, -3.0)]);
        let service = MeasurementService::new(estimator(), FixedBackend::ok(remote), TemplatePose);
        let outcome = service
            .measure(180.0, photos(), &mut ConstantSource::midpoint())
            .unwrap();
        assert_eq!(outcome.source, MeasurementSource::Local);
    }

    #[test]
    fn pose_errors_are_soft() {
        let service = MeasurementService::new(estimator(), FixedBackend::failing(), BrokenPose);
        let outcome = service
            .measure(
                180.0,
                Photos {
                    front: "abc",
                    side: Some("def"),
                },
                &mut ConstantSource::midpoint(),
            )
            .unwrap();
        assert!(outcome.landmarks.front.is_none());
        assert!(outcome.landmarks.side.is_none());
    }

    #[test]
    fn invalid_height_fails_before_collaborators() {
        let backend = FixedBackend::failing();
        let service = MeasurementService::new(estimator(), &backend, TemplatePose);
        let err = service
            .measure(250.0, photos(), &mut ConstantSource::midpoint())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeight { .. }));
        assert!(backend.seen.borrow().is_empty());
    }

    #[test]
    fn request_uses_camel_case() {
        let request = BackendRequest {
            gender: Gender::Female,
            height: 65.0,
            measurement_system: MeasurementSystem::Imperial,
            front_image_base64: "a".into(),
            side_image_base64: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"measurementSystem\":\"imperial\""));
        assert!(json.contains("\"frontImageBase64\":\"a\""));
        assert!(!json.contains("sideImageBase64"));
    }

    #[test]
    fn response_body_is_parsed() {
        let backend = RecordedBackend(r#"{"measurements":{"chest":101.5,"waist":86.0,"upperArm":33.0}}"#);
        let service = MeasurementService::new(estimator(), backend, TemplatePose);
        let outcome = service
            .measure(180.0, photos(), &mut ConstantSource::midpoint())
            .unwrap();
        assert_eq!(outcome.source, MeasurementSource::Backend);
        assert_eq!(outcome.measurements.get(MeasurementKey::Chest), Some(101.5));
        assert_eq!(outcome.measurements.get(MeasurementKey::UpperArm), Some(33.0));
        assert_eq!(outcome.measurements.height(), Some(180.0));
    }

    #[test]
    fn malformed_response_body_falls_back() {
        assert!(BackendResponse::parse(r#"{"measurements":{"wingspan":180.0}}"#).is_err());
        assert!(BackendResponse::parse("<html>502</html>").is_err());

        let service = MeasurementService::new(estimator(), RecordedBackend("{}"), TemplatePose);
        let outcome = service
            .measure(180.0, photos(), &mut ConstantSource::midpoint())
            .unwrap();
        assert_eq!(outcome.source, MeasurementSource::Local);
    }
}
