use std::sync::Arc;

use tracing::info;

use crate::domain::notification::{alert_for_prediction, CsvNotifier, NotificationEvent, NotificationLevel, Notifier};
use crate::domain::prediction::Prediction;
use crate::domain::sensor::{SensorHealth, SensorReading};
use crate::state::AppState;
use crate::storage::AppendLog;
use crate::utils::error::AppError;

/// Read side of the pipeline plus manual alerting, for whatever surface
/// sits in front of the logs
pub struct MonitoringService<N: Notifier> {
    readings: AppendLog<SensorReading>,
    predictions: AppendLog<Prediction>,
    sensor_health: AppendLog<SensorHealth>,
    notifier: Arc<N>,
}

impl<N: Notifier> Clone for MonitoringService<N> {
    fn clone(&self) -> Self {
        Self {
            readings: self.readings.clone(),
            predictions: self.predictions.clone(),
            sensor_health: self.sensor_health.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl MonitoringService<CsvNotifier> {
    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.readings.clone(),
            state.predictions.clone(),
            state.sensor_health.clone(),
            Arc::clone(&state.notifier),
        )
    }
}

impl<N: Notifier> MonitoringService<N> {
    pub fn new(
        readings: AppendLog<SensorReading>,
        predictions: AppendLog<Prediction>,
        sensor_health: AppendLog<SensorHealth>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            readings,
            predictions,
            sensor_health,
            notifier,
        }
    }

    /// 가장 최근 예측 조회
    pub async fn latest_prediction(&self) -> Result<Option<Prediction>, AppError> {
        self.predictions.read_last().await
    }

    pub async fn all_readings(&self) -> Result<Vec<SensorReading>, AppError> {
        self.readings.read_all().await
    }

    /// Externally maintained health table; a missing file reads as empty
    pub async fn sensor_health_snapshot(&self) -> Result<Vec<SensorHealth>, AppError> {
        self.sensor_health.read_all().await
    }

    pub async fn list_notifications(&self) -> Result<Vec<NotificationEvent>, AppError> {
        self.notifier.list().await
    }

    pub async fn push_notification(
        &self,
        level: NotificationLevel,
        message: &str,
    ) -> Result<NotificationEvent, AppError> {
        self.notifier.notify(level, message).await
    }

    /// 최신 예측 기반 경보 발행
    ///
    /// - 예측이 없거나 3시간 위험도가 normal이면 아무것도 발행하지 않음
    /// - warning/critical이면 위치를 포함한 경보를 저장
    pub async fn escalate_latest_prediction(&self) -> Result<Option<NotificationEvent>, AppError> {
        let Some(prediction) = self.latest_prediction().await? else {
            return Ok(None);
        };
        let Some((level, message)) = alert_for_prediction(&prediction) else {
            return Ok(None);
        };

        let event = self.notifier.notify(level, &message).await?;
        info!(level = %event.level, probability = prediction.probability, "Latest prediction escalated");
        Ok(Some(event))
    }
}
