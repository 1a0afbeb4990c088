use crate::storage::record::{expect_fields, parse_f64, parse_field, parse_instant};
use crate::storage::{CsvRecord, RecordError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp format of the readings log
pub const READING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cosmetic label attached to each reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
    Critical,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Normal, EventType::Warning, EventType::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
            EventType::Critical => "Critical",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(EventType::Normal),
            "warning" => Ok(EventType::Warning),
            "critical" => Ok(EventType::Critical),
            _ => Err("invalid event type: expected 'Normal', 'Warning', or 'Critical'"),
        }
    }
}

/// One synthetic structural-monitoring reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Local wall-clock time, second resolution
    pub timestamp: NaiveDateTime,
    /// g
    pub accelerometer_x: f64,
    /// g
    pub accelerometer_y: f64,
    /// g
    pub accelerometer_z: f64,
    /// deg
    pub inclinometer: f64,
    /// mm
    pub extensometer: f64,
    /// kPa
    pub piezometer: f64,
    pub event_type: EventType,
}

impl CsvRecord for SensorReading {
    const HEADER: &'static [&'static str] = &[
        "Timestamp",
        "Accelerometer X (g)",
        "Accelerometer Y (g)",
        "Accelerometer Z (g)",
        "Inclinometer (deg)",
        "Extensometer (mm)",
        "Piezometer (kPa)",
        "Event Type",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format(READING_TIMESTAMP_FORMAT).to_string(),
            self.accelerometer_x.to_string(),
            self.accelerometer_y.to_string(),
            self.accelerometer_z.to_string(),
            self.inclinometer.to_string(),
            self.extensometer.to_string(),
            self.piezometer.to_string(),
            self.event_type.to_string(),
        ]
    }

    fn from_row(row: &[String]) -> Result<Self, RecordError> {
        expect_fields(row, Self::HEADER.len())?;

        let timestamp = NaiveDateTime::parse_from_str(row[0].trim(), READING_TIMESTAMP_FORMAT)
            .map_err(|_| RecordError::InvalidField {
                field: "Timestamp",
                value: row[0].clone(),
            })?;

        Ok(Self {
            timestamp,
            accelerometer_x: parse_f64(row, 1, "Accelerometer X (g)")?,
            accelerometer_y: parse_f64(row, 2, "Accelerometer Y (g)")?,
            accelerometer_z: parse_f64(row, 3, "Accelerometer Z (g)")?,
            inclinometer: parse_f64(row, 4, "Inclinometer (deg)")?,
            extensometer: parse_f64(row, 5, "Extensometer (mm)")?,
            piezometer: parse_f64(row, 6, "Piezometer (kPa)")?,
            event_type: parse_field(row, 7, "Event Type")?,
        })
    }
}

/// Health of one physical sensor, maintained outside this process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorHealth {
    pub sensor_name: String,
    /// Percent
    pub battery_life: i32,
    /// Percent
    pub accuracy: i32,
    pub last_updated: DateTime<Utc>,
}

impl CsvRecord for SensorHealth {
    const HEADER: &'static [&'static str] =
        &["sensorName", "batteryLife", "accuracy", "lastUpdated"];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.sensor_name.clone(),
            self.battery_life.to_string(),
            self.accuracy.to_string(),
            self.last_updated.to_rfc3339(),
        ]
    }

    fn from_row(row: &[String]) -> Result<Self, RecordError> {
        expect_fields(row, Self::HEADER.len())?;
        Ok(Self {
            sensor_name: row[0].trim().to_string(),
            battery_life: parse_field(row, 1, "batteryLife")?,
            accuracy: parse_field(row, 2, "accuracy")?,
            last_updated: parse_instant(&row[3], "lastUpdated")?,
        })
    }
}
