pub mod fs;
pub mod http;

use crate::error::SourceError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

pub type ByteStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// A byte-range addressable object in blob storage. Immutable for the
/// duration of a run.
#[async_trait]
pub trait SourceObject: Send + Sync {
    /// Total size of the object in bytes.
    async fn content_length(&self) -> Result<u64, SourceError>;

    /// Stream of the object's bytes from `offset` to the end of the object.
    async fn read_range(&self, offset: u64) -> Result<ByteStream, SourceError>;
}
