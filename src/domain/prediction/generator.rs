//! Periodic prediction from the newest sensor reading

use crate::domain::notification::{prediction_message, NotificationLevel, Notifier};
use crate::domain::prediction::dto::{HorizonForecast, Location, Prediction};
use crate::domain::risk::{RiskFeatureVector, RiskScorer};
use crate::domain::sensor::SensorReading;
use crate::scheduler::{PeriodicTask, TickOutcome};
use crate::storage::AppendLog;
use crate::utils::AppError;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Starting point of the predicted epicenter
pub const INITIAL_LOCATION: Location = Location::new(12.5, 8.3, -45.0);

/// Upper bound of the scaled model output before noise, in percent
const BASE_CEILING: f64 = 30.0;
/// Upper bound of the published probability, in percent
const PROBABILITY_CEILING: f64 = 35.0;
const NOISE: f64 = 5.0;
const DRIFT_XY: f64 = 1.0;
const DRIFT_Z: f64 = 0.5;

/// Map a model score in [0, 1] and a noise term to the published percent.
/// The result is rounded to one decimal and never leaves [0, 35].
pub fn scale_probability(score: f64, noise: f64) -> f64 {
    let base = (score * 100.0).clamp(0.0, BASE_CEILING);
    (((base + noise) * 10.0).round() / 10.0).clamp(0.0, PROBABILITY_CEILING)
}

/// Epicenter that wanders a little at most once per interval
#[derive(Debug, Clone)]
pub struct DriftingLocation {
    current: Location,
    last_update: Option<Instant>,
    interval: Duration,
}

impl DriftingLocation {
    pub fn new(start: Location, interval: Duration) -> Self {
        Self {
            current: start,
            last_update: None,
            interval,
        }
    }

    pub fn current(&self) -> Location {
        self.current
    }

    /// Perturb the location if it was never moved or the interval has passed.
    /// Returns whether it moved.
    pub fn maybe_drift<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> bool {
        let due = match self.last_update {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        };
        if !due {
            return false;
        }

        self.current = Location::new(
            self.current.x + rng.gen_range(-DRIFT_XY..=DRIFT_XY),
            self.current.y + rng.gen_range(-DRIFT_XY..=DRIFT_XY),
            self.current.z + rng.gen_range(-DRIFT_Z..=DRIFT_Z),
        );
        self.last_update = Some(now);
        true
    }
}

/// Turns the latest reading into a prediction plus one notification per tick
pub struct PredictionGenerator<N: Notifier> {
    readings: AppendLog<SensorReading>,
    predictions: AppendLog<Prediction>,
    notifier: Arc<N>,
    scorer: RiskScorer,
    location: DriftingLocation,
    rng: StdRng,
}

impl<N: Notifier + 'static> PredictionGenerator<N> {
    pub fn new(
        readings: AppendLog<SensorReading>,
        predictions: AppendLog<Prediction>,
        notifier: Arc<N>,
        scorer: RiskScorer,
        drift_interval: Duration,
    ) -> Self {
        Self::with_rng(
            readings,
            predictions,
            notifier,
            scorer,
            drift_interval,
            StdRng::from_entropy(),
        )
    }

    pub fn with_rng(
        readings: AppendLog<SensorReading>,
        predictions: AppendLog<Prediction>,
        notifier: Arc<N>,
        scorer: RiskScorer,
        drift_interval: Duration,
        rng: StdRng,
    ) -> Self {
        info!(
            readings = %readings.path().display(),
            predictions = %predictions.path().display(),
            "Prediction generator initialized"
        );
        Self {
            readings,
            predictions,
            notifier,
            scorer,
            location: DriftingLocation::new(INITIAL_LOCATION, drift_interval),
            rng,
        }
    }

    pub fn location(&self) -> Location {
        self.location.current()
    }

    /// Score one reading into a prediction at the current location
    pub fn predict(&mut self, reading: &SensorReading) -> Prediction {
        let score = self.scorer.score(&RiskFeatureVector::from(reading));
        let noise = self.rng.gen_range(-NOISE..=NOISE);
        let probability = scale_probability(score, noise);

        Prediction::new(
            Utc::now(),
            probability,
            HorizonForecast::from_probability(probability),
            self.location.current(),
        )
    }
}

#[async_trait]
impl<N: Notifier + 'static> PeriodicTask for PredictionGenerator<N> {
    fn name(&self) -> &'static str {
        "prediction-generator"
    }

    #[instrument(skip(self), level = "debug")]
    async fn tick(&mut self) -> Result<TickOutcome, AppError> {
        let Some(reading) = self.readings.read_last().await? else {
            debug!("No sensor reading yet, skipping prediction");
            return Ok(TickOutcome::Skipped);
        };

        let prediction = self.predict(&reading);

        self.notifier
            .notify(
                NotificationLevel::from(prediction.next_3_hours),
                &prediction_message(prediction.next_3_hours, prediction.probability),
            )
            .await?;
        self.predictions.append(&prediction).await?;

        if self.location.maybe_drift(Instant::now(), &mut self.rng) {
            let location = self.location.current();
            debug!(x = location.x, y = location.y, z = location.z, "Prediction location drifted");
        }

        debug!(
            probability = prediction.probability,
            next_3_hours = %prediction.next_3_hours,
            "Prediction appended"
        );

        Ok(TickOutcome::Completed)
    }
}
