use crate::domain::sensor::SensorReading;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub const FEATURE_COUNT: usize = 6;

/// Probability used when the model produces something unusable
const WORST_CASE_PROBABILITY: f64 = 1.0;

/// Inputs of the risk model, in fixed order:
/// ax, ay, az, inclinometer, extensometer, piezometer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFeatureVector {
    pub accelerometer_x: f64,
    pub accelerometer_y: f64,
    pub accelerometer_z: f64,
    pub inclinometer: f64,
    pub extensometer: f64,
    pub piezometer: f64,
}

impl RiskFeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [accelerometer_x, accelerometer_y, accelerometer_z, inclinometer, extensometer, piezometer] =
            values;
        Self {
            accelerometer_x,
            accelerometer_y,
            accelerometer_z,
            inclinometer,
            extensometer,
            piezometer,
        }
    }

    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.accelerometer_x,
            self.accelerometer_y,
            self.accelerometer_z,
            self.inclinometer,
            self.extensometer,
            self.piezometer,
        ]
    }
}

impl From<&SensorReading> for RiskFeatureVector {
    fn from(reading: &SensorReading) -> Self {
        Self {
            accelerometer_x: reading.accelerometer_x,
            accelerometer_y: reading.accelerometer_y,
            accelerometer_z: reading.accelerometer_z,
            inclinometer: reading.inclinometer,
            extensometer: reading.extensometer,
            piezometer: reading.piezometer,
        }
    }
}

/// Any regression that maps the feature vector to a raw score
pub trait RiskModel: Send + Sync {
    fn predict(&self, features: &RiskFeatureVector) -> f64;
}

/// Bounded-output wrapper around a trained model.
///
/// Cheap to clone; clones share the model.
#[derive(Clone)]
pub struct RiskScorer {
    model: Arc<dyn RiskModel>,
}

impl fmt::Debug for RiskScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskScorer").finish_non_exhaustive()
    }
}

impl RiskScorer {
    pub fn new(model: impl RiskModel + 'static) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    /// Probability in `[0, 1]`, rounded to three decimals.
    /// Non-finite model output scores as the worst case.
    pub fn score(&self, features: &RiskFeatureVector) -> f64 {
        let raw = self.model.predict(features);
        if !raw.is_finite() {
            warn!(raw = %raw, "Risk model returned a non-finite score, using worst case");
            return WORST_CASE_PROBABILITY;
        }
        (raw.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
    }
}
