use connectors::error::{DeliveryError, SourceError};
use engine_runtime::error::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the payload file: {0}")]
    PayloadFileRead(#[from] std::io::Error),

    #[error("Failed to parse the trigger payload as JSON: {0}")]
    PayloadParse(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Import run failed: {0}")]
    Import(#[from] ImportError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Upstream configuration error: {0}")]
    Upstream(#[from] DeliveryError),
}
