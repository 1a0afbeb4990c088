pub mod dto;
pub mod service;

pub use dto::{NotificationEvent, NotificationLevel};
pub use service::{alert_for_prediction, prediction_message, CsvNotifier, Notifier};
