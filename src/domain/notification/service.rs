//! Append-only alert sink

use crate::domain::notification::dto::{NotificationEvent, NotificationLevel};
use crate::domain::prediction::{Prediction, RiskLevel};
use crate::storage::AppendLog;
use crate::utils::AppError;
use async_trait::async_trait;
use tracing::{info, instrument};

/// Result type for notifier operations
pub type NotifyResult<T> = Result<T, AppError>;

/// Sink for alert events. Every call to `notify` stores a new event; there is
/// no deduplication and no rate limiting.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Store a new event timestamped now and return it
    async fn notify(&self, level: NotificationLevel, message: &str) -> NotifyResult<NotificationEvent>;

    /// All stored events, oldest first
    async fn list(&self) -> NotifyResult<Vec<NotificationEvent>>;
}

/// Notifier backed by the notifications CSV log
#[derive(Debug, Clone)]
pub struct CsvNotifier {
    log: AppendLog<NotificationEvent>,
}

impl CsvNotifier {
    pub fn new(log: AppendLog<NotificationEvent>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Notifier for CsvNotifier {
    #[instrument(skip(self, message))]
    async fn notify(&self, level: NotificationLevel, message: &str) -> NotifyResult<NotificationEvent> {
        let event = NotificationEvent::new(level, message);
        self.log.append(&event).await?;

        info!(level = %event.level, message = %event.message, "Notification stored");
        Ok(event)
    }

    async fn list(&self) -> NotifyResult<Vec<NotificationEvent>> {
        self.log.ensure().await?;
        self.log.read_all().await
    }
}

/// Message sent for every generated prediction
pub fn prediction_message(level: RiskLevel, probability: f64) -> String {
    format!(
        "Rockfall risk is {} ({:.1}%)",
        level.as_str().to_uppercase(),
        probability
    )
}

/// Alert re-derived from a stored prediction. The 3-hour horizon decides the
/// severity; normal risk raises nothing.
pub fn alert_for_prediction(prediction: &Prediction) -> Option<(NotificationLevel, String)> {
    let level = prediction.next_3_hours;
    let severity = match level {
        RiskLevel::Critical => NotificationLevel::Critical,
        RiskLevel::Warning => NotificationLevel::Warning,
        RiskLevel::Normal => return None,
    };

    let location = &prediction.location;
    let message = format!(
        "Rockfall risk {} detected at ({}, {}, {})",
        level.as_str().to_uppercase(),
        location.x,
        location.y,
        location.z
    );

    Some((severity, message))
}
