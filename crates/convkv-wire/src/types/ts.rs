//! Time-series cells and rows.

use chrono::{DateTime, Utc};

/// A single time-series column value.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TsCell {
    /// Column with no mapped field.
    Null,
    Varchar(String),
    Sint64(i64),
    Timestamp(DateTime<Utc>),
}

impl TsCell {
    /// Store-side type name of the cell.
    #[must_use]
    pub fn data_type(&self) -> &'static str {
        match self {
            TsCell::Null => "NULL",
            TsCell::Varchar(_) => "VARCHAR",
            TsCell::Sint64(_) => "SINT64",
            TsCell::Timestamp(_) => "TIMESTAMP",
        }
    }
}

/// One row, indexed by column position.
pub type TsRow = Vec<TsCell>;

/// Timestamp in the form time-series queries compare against (Unix millis).
#[inline]
#[must_use]
pub fn ts_time_format(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}
