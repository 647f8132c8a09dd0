use thiserror::Error;

use crate::types::MeasurementKey;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid height: {value} cm is outside the supported range 100-220 cm")]
    InvalidHeight { value: f64 },

    #[error("Unknown gender category: {0:?}")]
    UnknownGender(String),

    #[error("Unknown model variant: {0:?}")]
    UnknownModelVariant(String),

    #[error("Unknown measurement: {0:?}")]
    UnknownMeasurement(String),

    #[error("Measurement {0} has no entry in the scale factor table")]
    UnsupportedMeasurement(MeasurementKey),

    #[error("Unknown accuracy level: {0:?}")]
    UnknownAccuracyLevel(String),

    #[error("Unknown measurement system: {0:?}")]
    UnknownMeasurementSystem(String),

    #[error("Unknown precision mode: {0:?}")]
    UnknownPrecisionMode(String),

    #[error("Unknown joint: {0:?}")]
    UnknownJoint(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Measurement backend failed: {0}")]
    Backend(String),
}

impl Error {
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }

    pub fn backend(details: impl Into<String>) -> Self {
        Self::Backend(details.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
