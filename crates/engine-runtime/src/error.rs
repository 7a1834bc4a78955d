use connectors::error::{DeliveryError, SourceError};
use thiserror::Error;

/// Top-level errors for an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
