use thiserror::Error;

/// Errors raised by line selection, schema resolution and the line store.
///
/// I/O-facing code wraps these in [`anyhow::Error`] with context; callers
/// that care about the kind can still `downcast_ref::<LineError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineError {
    #[error("invalid query window [{min}, {max}]: bounds must be finite")]
    InvalidWindow { min: f64, max: f64 },

    #[error("invalid line limit {0}: must be non-negative")]
    InvalidLimit(i64),

    #[error("invalid line record: {0}")]
    InvalidRecord(String),

    #[error("ambiguous schema: token '{token}' matches columns {columns:?}")]
    AmbiguousSchema { token: String, columns: Vec<String> },

    #[error("missing schema: no column matches '{token}'")]
    MissingSchema { token: String },

    #[error("expected 3 column names or indices (wavelength, species, priority), got {0}")]
    WrongHeaderCount(usize),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("source '{0}' is already registered")]
    DuplicateSource(String),

    #[error("line {line}, column {column}: '{value}' is not a valid {expected}")]
    InvalidField {
        line: usize,
        column: usize,
        value: String,
        expected: &'static str,
    },
}
