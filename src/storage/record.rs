//! Typed CSV records
//!
//! Every log row maps to exactly one typed record. Formatting and parsing are
//! explicit so that a bad row can be rejected without touching its neighbours.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::str::FromStr;

/// Error raised when a row cannot be turned into its typed record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// A record that can be stored as one CSV line
pub trait CsvRecord: Sized {
    /// Header row written once when the log is created
    const HEADER: &'static [&'static str];

    /// Format the record into its fields, in header order
    fn to_row(&self) -> Vec<String>;

    /// Parse a record from its fields, in header order
    fn from_row(row: &[String]) -> Result<Self, RecordError>;
}

/// Encode fields into a single CSV line (without the trailing newline)
///
/// Fields containing a comma or quote are quoted with doubled quotes.
/// CR and LF are replaced with a space so a record never spans two lines.
pub fn encode_line<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| {
            let flat: String = field
                .as_ref()
                .chars()
                .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                .collect();
            if flat.contains(',') || flat.contains('"') {
                format!("\"{}\"", flat.replace('"', "\"\""))
            } else {
                flat
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Split one CSV line into its fields
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

/// Check the field count of a row before indexing into it
pub fn expect_fields(row: &[String], expected: usize) -> Result<(), RecordError> {
    if row.len() != expected {
        return Err(RecordError::FieldCount {
            expected,
            found: row.len(),
        });
    }
    Ok(())
}

/// Parse a single typed field, naming it in the error
pub fn parse_field<T: FromStr>(row: &[String], index: usize, field: &'static str) -> Result<T, RecordError> {
    let raw = row.get(index).map(|s| s.trim()).unwrap_or_default();
    raw.parse().map_err(|_| RecordError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

/// Parse a finite float field
pub fn parse_f64(row: &[String], index: usize, field: &'static str) -> Result<f64, RecordError> {
    let value: f64 = parse_field(row, index, field)?;
    if !value.is_finite() {
        return Err(RecordError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Parse an instant written as RFC 3339, or as an offset-less ISO-8601
/// timestamp (optionally suffixed with `Z`) which is read as UTC
pub fn parse_instant(raw: &str, field: &'static str) -> Result<DateTime<Utc>, RecordError> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|_| RecordError::InvalidField {
            field,
            value: raw.to_string(),
        })
}

/// Format an instant for storage
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn should_quote_fields_with_commas_and_quotes() {
        // Act
        let line = encode_line(&["plain", "a,b", "say \"hi\""]);

        // Assert
        assert_eq!(line, "plain,\"a,b\",\"say \"\"hi\"\"\"");
    }

    #[test]
    fn should_split_quoted_fields_back() {
        // Arrange
        let original = vec![
            "2025-01-01T00:00:00+00:00".to_string(),
            "critical".to_string(),
            "Rockfall risk CRITICAL detected at (1.5, 2.5, -45)".to_string(),
        ];

        // Act
        let fields = split_line(&encode_line(&original));

        // Assert
        assert_eq!(fields, original);
    }

    #[test]
    fn should_flatten_newlines_inside_fields() {
        // Act
        let line = encode_line(&["first\nsecond\r\nthird"]);

        // Assert
        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert_eq!(line, "first second  third");
    }

    #[test]
    fn should_keep_empty_trailing_field() {
        // Act
        let fields = split_line("a,b,");

        // Assert
        assert_eq!(fields, vec!["a", "b", ""]);
    }

    #[test]
    fn should_reject_non_finite_float() {
        // Arrange
        let row = vec!["NaN".to_string()];

        // Act
        let result = parse_f64(&row, 0, "probability");

        // Assert
        assert!(matches!(
            result,
            Err(RecordError::InvalidField { field: "probability", .. })
        ));
    }

    #[test]
    fn should_parse_rfc3339_and_legacy_instants() {
        // Act
        let rfc = parse_instant("2025-03-04T05:06:07+00:00", "timestamp").unwrap();
        let legacy = parse_instant("2025-03-04T05:06:07.123456", "timestamp").unwrap();
        let zulu = parse_instant("2025-03-04T05:06:07Z", "timestamp").unwrap();

        // Assert
        assert_eq!(rfc.year(), 2025);
        assert_eq!(rfc.second(), 7);
        assert_eq!(legacy.hour(), 5);
        assert_eq!(legacy.timestamp_subsec_micros(), 123456);
        assert_eq!(zulu, rfc);
    }

    #[test]
    fn should_reject_garbage_instant() {
        // Act
        let result = parse_instant("yesterday", "timestamp");

        // Assert
        assert!(result.is_err());
    }
}
