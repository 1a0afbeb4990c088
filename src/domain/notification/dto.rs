use crate::domain::prediction::RiskLevel;
use crate::storage::record::{expect_fields, format_instant, parse_field, parse_instant};
use crate::storage::{CsvRecord, RecordError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[serde(alias = "normal")]
    Info,
    Warning,
    Critical,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            // Older logs stored the raw risk level
            "info" | "normal" => Ok(NotificationLevel::Info),
            "warning" => Ok(NotificationLevel::Warning),
            "critical" => Ok(NotificationLevel::Critical),
            _ => Err("invalid notification level: expected 'info', 'warning', or 'critical'"),
        }
    }
}

/// Normal risk is reported as plain information
impl From<RiskLevel> for NotificationLevel {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Normal => NotificationLevel::Info,
            RiskLevel::Warning => NotificationLevel::Warning,
            RiskLevel::Critical => NotificationLevel::Critical,
        }
    }
}

/// One stored alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub timestamp: DateTime<Utc>,
    pub level: NotificationLevel,
    pub message: String,
}

impl NotificationEvent {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

impl CsvRecord for NotificationEvent {
    const HEADER: &'static [&'static str] = &["timestamp", "level", "message"];

    fn to_row(&self) -> Vec<String> {
        vec![
            format_instant(&self.timestamp),
            self.level.to_string(),
            self.message.clone(),
        ]
    }

    fn from_row(row: &[String]) -> Result<Self, RecordError> {
        expect_fields(row, Self::HEADER.len())?;
        Ok(Self {
            timestamp: parse_instant(&row[0], "timestamp")?,
            level: parse_field(row, 1, "level")?,
            message: row[2].clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_risk_levels_to_notification_levels() {
        // Act & Assert
        assert_eq!(NotificationLevel::from(RiskLevel::Normal), NotificationLevel::Info);
        assert_eq!(NotificationLevel::from(RiskLevel::Warning), NotificationLevel::Warning);
        assert_eq!(NotificationLevel::from(RiskLevel::Critical), NotificationLevel::Critical);
    }

    #[test]
    fn should_parse_levels_case_insensitively() {
        // Act & Assert
        assert_eq!("CRITICAL".parse::<NotificationLevel>(), Ok(NotificationLevel::Critical));
        assert_eq!(" info ".parse::<NotificationLevel>(), Ok(NotificationLevel::Info));
        assert!("severe".parse::<NotificationLevel>().is_err());
    }

    #[test]
    fn should_read_legacy_normal_level_as_info() {
        // Arrange
        let row = vec![
            "2025-06-01T09:15:30".to_string(),
            "normal".to_string(),
            "Rockfall risk is NORMAL (12.0%)".to_string(),
        ];

        // Act
        let event = NotificationEvent::from_row(&row).unwrap();

        // Assert
        assert_eq!(event.level, NotificationLevel::Info);
        assert_eq!(event.to_row()[1], "info");
    }

    #[test]
    fn should_keep_message_with_commas_through_a_row() {
        // Arrange
        let event = NotificationEvent::new(
            NotificationLevel::Critical,
            "Rockfall risk CRITICAL detected at (12.5, 8.3, -45)",
        );

        // Act
        let parsed = NotificationEvent::from_row(&event.to_row()).unwrap();

        // Assert
        assert_eq!(parsed, event);
    }

    #[test]
    fn should_accept_legacy_timestamps() {
        // Arrange
        let row = vec![
            "2025-06-01T09:15:30.250000".to_string(),
            "warning".to_string(),
            "Rockfall risk is WARNING (41.0%)".to_string(),
        ];

        // Act
        let event = NotificationEvent::from_row(&row).unwrap();

        // Assert
        assert_eq!(event.level, NotificationLevel::Warning);
        assert_eq!(event.timestamp.timestamp_subsec_millis(), 250);
    }
}
