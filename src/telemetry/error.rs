/// Everything that can go wrong while ingesting or querying readings.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("missing required field: temperature or humidity or timestamp")]
    MissingField,

    /// The request body was not empty and did not parse as JSON.
    #[error("malformed JSON body: {0}")]
    MalformedBody(String),

    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// `temp` or `hum` was present but not a finite number.
    #[error("invalid {0}: expected a number")]
    InvalidNumber(&'static str),

    #[error("no records")]
    NoRecords,

    /// The store failed; the message is passed to the caller unchanged.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
