use crate::storage::record::{expect_fields, format_instant, parse_f64, parse_field, parse_instant};
use crate::storage::{CsvRecord, RecordError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower bound (inclusive) of the warning band, in percent
pub const WARNING_THRESHOLD: f64 = 40.0;
/// Lower bound (inclusive) of the critical band, in percent
pub const CRITICAL_THRESHOLD: f64 = 70.0;

/// Risk level of one horizon, ordered normal < warning < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Normal,
    Warning,
    Critical,
}

impl RiskLevel {
    /// Classify a probability given in percent
    pub fn from_probability(percent: f64) -> Self {
        if percent >= CRITICAL_THRESHOLD {
            RiskLevel::Critical
        } else if percent >= WARNING_THRESHOLD {
            RiskLevel::Warning
        } else {
            RiskLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "normal",
            RiskLevel::Warning => "warning",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(RiskLevel::Normal),
            "warning" => Ok(RiskLevel::Warning),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err("invalid risk level: expected 'normal', 'warning', or 'critical'"),
        }
    }
}

/// Risk levels for the four forecast horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonForecast {
    pub next_3_hours: RiskLevel,
    pub next_6_hours: RiskLevel,
    pub next_12_hours: RiskLevel,
    pub next_24_hours: RiskLevel,
}

impl HorizonForecast {
    /// Offsets (percent) added to the base probability per horizon
    pub const OFFSETS: [f64; 4] = [0.0, 5.0, 10.0, 15.0];

    /// Derive every horizon from the same base probability. Offsets grow with
    /// the horizon, so the levels never decrease.
    pub fn from_probability(percent: f64) -> Self {
        let [h3, h6, h12, h24] = Self::OFFSETS.map(|offset| RiskLevel::from_probability(percent + offset));
        Self {
            next_3_hours: h3,
            next_6_hours: h6,
            next_12_hours: h12,
            next_24_hours: h24,
        }
    }

    pub fn levels(&self) -> [RiskLevel; 4] {
        [
            self.next_3_hours,
            self.next_6_hours,
            self.next_12_hours,
            self.next_24_hours,
        ]
    }

    /// Whether longer horizons are never less risky than shorter ones
    pub fn is_monotonic(&self) -> bool {
        self.levels().windows(2).all(|pair| pair[0] <= pair[1])
    }
}

/// Coordinates of the predicted risk epicenter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "locationX")]
    pub x: f64,
    #[serde(rename = "locationY")]
    pub y: f64,
    #[serde(rename = "locationZ")]
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One stored prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub timestamp: DateTime<Utc>,
    /// Percent, 0-100
    pub probability: f64,
    #[serde(rename = "next3Hours")]
    pub next_3_hours: RiskLevel,
    #[serde(rename = "next6Hours")]
    pub next_6_hours: RiskLevel,
    #[serde(rename = "next12Hours")]
    pub next_12_hours: RiskLevel,
    #[serde(rename = "next24Hours")]
    pub next_24_hours: RiskLevel,
    #[serde(flatten)]
    pub location: Location,
}

impl Prediction {
    pub fn new(
        timestamp: DateTime<Utc>,
        probability: f64,
        forecast: HorizonForecast,
        location: Location,
    ) -> Self {
        Self {
            timestamp,
            probability,
            next_3_hours: forecast.next_3_hours,
            next_6_hours: forecast.next_6_hours,
            next_12_hours: forecast.next_12_hours,
            next_24_hours: forecast.next_24_hours,
            location,
        }
    }

    pub fn forecast(&self) -> HorizonForecast {
        HorizonForecast {
            next_3_hours: self.next_3_hours,
            next_6_hours: self.next_6_hours,
            next_12_hours: self.next_12_hours,
            next_24_hours: self.next_24_hours,
        }
    }
}

impl CsvRecord for Prediction {
    const HEADER: &'static [&'static str] = &[
        "timestamp",
        "probability",
        "next3Hours",
        "next6Hours",
        "next12Hours",
        "next24Hours",
        "locationX",
        "locationY",
        "locationZ",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            format_instant(&self.timestamp),
            self.probability.to_string(),
            self.next_3_hours.to_string(),
            self.next_6_hours.to_string(),
            self.next_12_hours.to_string(),
            self.next_24_hours.to_string(),
            self.location.x.to_string(),
            self.location.y.to_string(),
            self.location.z.to_string(),
        ]
    }

    fn from_row(row: &[String]) -> Result<Self, RecordError> {
        expect_fields(row, Self::HEADER.len())?;
        Ok(Self {
            timestamp: parse_instant(&row[0], "timestamp")?,
            probability: parse_f64(row, 1, "probability")?,
            next_3_hours: parse_field(row, 2, "next3Hours")?,
            next_6_hours: parse_field(row, 3, "next6Hours")?,
            next_12_hours: parse_field(row, 4, "next12Hours")?,
            next_24_hours: parse_field(row, 5, "next24Hours")?,
            location: Location::new(
                parse_f64(row, 6, "locationX")?,
                parse_f64(row, 7, "locationY")?,
                parse_f64(row, 8, "locationZ")?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_threshold_boundaries() {
        // Act & Assert
        assert_eq!(RiskLevel::from_probability(39.999), RiskLevel::Normal);
        assert_eq!(RiskLevel::from_probability(40.0), RiskLevel::Warning);
        assert_eq!(RiskLevel::from_probability(69.999), RiskLevel::Warning);
        assert_eq!(RiskLevel::from_probability(70.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_probability(100.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Normal);
    }

    #[test]
    fn should_order_levels_by_risk() {
        // Act & Assert
        assert!(RiskLevel::Normal < RiskLevel::Warning);
        assert!(RiskLevel::Warning < RiskLevel::Critical);
    }

    #[test]
    fn should_derive_monotonic_horizons_over_whole_range() {
        // Act & Assert
        for tenth in 0..=1000 {
            let percent = tenth as f64 / 10.0;
            let forecast = HorizonForecast::from_probability(percent);
            assert!(forecast.is_monotonic(), "not monotonic at {}", percent);
        }
    }

    #[test]
    fn should_apply_horizon_offsets() {
        // Act
        let forecast = HorizonForecast::from_probability(30.0);

        // Assert - 30, 35, 40, 45
        assert_eq!(
            forecast.levels(),
            [
                RiskLevel::Normal,
                RiskLevel::Normal,
                RiskLevel::Warning,
                RiskLevel::Warning
            ]
        );
    }

    #[test]
    fn should_round_trip_prediction_row() {
        // Arrange
        let prediction = Prediction::new(
            Utc::now(),
            17.3,
            HorizonForecast::from_probability(17.3),
            Location::new(12.5, 8.3, -45.0),
        );

        // Act
        let parsed = Prediction::from_row(&prediction.to_row()).unwrap();

        // Assert
        assert_eq!(parsed, prediction);
    }

    #[test]
    fn should_reject_unknown_risk_level() {
        // Arrange
        let row: Vec<String> = [
            "2025-06-01T10:00:00+00:00",
            "12.0",
            "HIGH",
            "normal",
            "normal",
            "normal",
            "1",
            "2",
            "3",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        // Act
        let result = Prediction::from_row(&row);

        // Assert
        assert!(matches!(
            result,
            Err(RecordError::InvalidField { field: "next3Hours", .. })
        ));
    }

    #[test]
    fn should_serialize_with_flat_location_keys() {
        // Arrange
        let prediction = Prediction::new(
            Utc::now(),
            5.0,
            HorizonForecast::from_probability(5.0),
            Location::new(1.0, 2.0, 3.0),
        );

        // Act
        let json = serde_json::to_value(&prediction).unwrap();

        // Assert
        assert_eq!(json["next3Hours"], "normal");
        assert_eq!(json["locationX"], 1.0);
        assert_eq!(json["locationZ"], 3.0);
        assert!(json.get("location").is_none());
    }
}
