use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::notification::CsvNotifier;
use crate::domain::prediction::Prediction;
use crate::domain::risk::RiskScorer;
use crate::domain::sensor::{SensorHealth, SensorReading};
use crate::storage::AppendLog;

/// Handles shared by the generators and the monitoring facade
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub readings: AppendLog<SensorReading>,
    pub predictions: AppendLog<Prediction>,
    pub sensor_health: AppendLog<SensorHealth>,
    pub notifier: Arc<CsvNotifier>,
    pub scorer: RiskScorer,
}

impl AppState {
    /// Open every log under the configured data directory. Files are created
    /// lazily on first write.
    pub fn new(config: AppConfig, scorer: RiskScorer) -> Self {
        Self {
            readings: AppendLog::new(config.readings_path()),
            predictions: AppendLog::new(config.predictions_path()),
            sensor_health: AppendLog::new(config.sensor_health_path()),
            notifier: Arc::new(CsvNotifier::new(AppendLog::new(config.notifications_path()))),
            scorer,
            config,
        }
    }
}
