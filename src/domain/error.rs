//! Domain error types.

use chrono::NaiveDate;

use super::series::PriceField;

/// Top-level error type for northflow.
#[derive(Debug, thiserror::Error)]
pub enum NorthflowError {
    #[error("{date} is not a known trading day")]
    UnknownDate { date: NaiveDate },

    #[error("shifting {date} by {offset} trading days leaves the loaded calendar")]
    OutOfRange { date: NaiveDate, offset: i64 },

    #[error("at least one buy and one sell signal required (got {buy_count} buy, {sell_count} sell)")]
    InsufficientSignals { buy_count: usize, sell_count: usize },

    #[error("holding period {entry} -> {exit} is empty or out of order")]
    InvalidPeriod { entry: NaiveDate, exit: NaiveDate },

    #[error("no {field} price on {date}")]
    MissingPriceData { date: NaiveDate, field: PriceField },

    #[error("unusable {field} price {value} on {date}")]
    InvalidPriceData {
        date: NaiveDate,
        field: PriceField,
        value: f64,
    },

    #[error("no trading days strictly between {start} and {end}")]
    DivisionByZero { start: NaiveDate, end: NaiveDate },

    #[error("trading calendar unavailable: {reason}")]
    CalendarLoad { reason: String },

    #[error("series dates must be strictly increasing (offending date {date})")]
    UnsortedSeries { date: NaiveDate },

    #[error("rolling window must be at least 2 (got {window})")]
    InvalidWindow { window: usize },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("data query error: {reason}")]
    DataQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NorthflowError {
    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            NorthflowError::Io(_) => 1,
            NorthflowError::ConfigParse { .. }
            | NorthflowError::ConfigMissing { .. }
            | NorthflowError::ConfigInvalid { .. } => 2,
            NorthflowError::Data { .. }
            | NorthflowError::DataQuery { .. }
            | NorthflowError::UnsortedSeries { .. } => 3,
            NorthflowError::UnknownDate { .. }
            | NorthflowError::OutOfRange { .. }
            | NorthflowError::CalendarLoad { .. } => 4,
            NorthflowError::InsufficientSignals { .. }
            | NorthflowError::InvalidPeriod { .. }
            | NorthflowError::MissingPriceData { .. }
            | NorthflowError::InvalidPriceData { .. }
            | NorthflowError::DivisionByZero { .. }
            | NorthflowError::InvalidWindow { .. } => 5,
        }
    }
}

impl From<&NorthflowError> for std::process::ExitCode {
    fn from(err: &NorthflowError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
