//! Append-only persistence shared by the readings, predictions and
//! notifications logs

pub mod append_log;
pub mod record;

pub use append_log::{AppendLog, LogResult};
pub use record::{CsvRecord, RecordError};
