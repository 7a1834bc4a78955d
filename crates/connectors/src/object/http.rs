use crate::error::SourceError;
use crate::object::{ByteStream, SourceObject};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::RANGE;

/// Source object addressed over HTTP: length via HEAD, reads via
/// `Range: bytes=N-` requests.
#[derive(Debug, Clone)]
pub struct HttpObject {
    client: reqwest::Client,
    url: String,
}

impl HttpObject {
    pub fn new(url: impl Into<String>) -> Self {
        HttpObject {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourceObject for HttpObject {
    async fn content_length(&self) -> Result<u64, SourceError> {
        let response = self
            .client
            .head(&self.url)
            .send()
            .await?
            .error_for_status()?;
        response
            .content_length()
            .ok_or(SourceError::MissingContentLength)
    }

    async fn read_range(&self, offset: u64) -> Result<ByteStream, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={offset}-"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes_stream().map_err(SourceError::from).boxed())
    }
}
