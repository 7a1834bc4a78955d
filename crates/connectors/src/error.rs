use thiserror::Error;

/// Errors raised while reading the source object.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Object read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Range request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse line into cells: {0}")]
    Csv(#[from] csv::Error),

    #[error("Source is not valid UTF-8 near byte offset {offset}")]
    Utf8 { offset: u64 },

    #[error(
        "File headers don't match the expected format. \
         First column should specify a user's '{expected}', got '{actual}'"
    )]
    MalformedHeader {
        expected: &'static str,
        actual: String,
    },

    #[error("Object did not report a content length")]
    MissingContentLength,
}

/// Classified outcome of a failed upstream delivery attempt. Retryable
/// failures are retried with backoff inside the delivery call; fatal ones
/// abort the run.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Retryable upstream failure: {0}")]
    Retryable(String),

    #[error("Fatal upstream failure: {0}")]
    Fatal(String),
}
