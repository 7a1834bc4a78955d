use crate::error::SourceError;
use crate::object::{ByteStream, SourceObject};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::io::AsyncSeekExt;
use tokio_util::io::ReaderStream;

/// Source object backed by a local file; a byte-range read is a seek.
#[derive(Debug, Clone)]
pub struct FsObject {
    path: PathBuf,
}

impl FsObject {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FsObject { path: path.into() }
    }
}

#[async_trait]
impl SourceObject for FsObject {
    async fn content_length(&self) -> Result<u64, SourceError> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    async fn read_range(&self, offset: u64) -> Result<ByteStream, SourceError> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(ReaderStream::new(file).map_err(SourceError::from).boxed())
    }
}
