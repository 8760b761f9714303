use crate::{buffer::Buffer, config::FetchSettings, error::{ConfigError, FetchError}};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use tracing::debug;

/// Retrieval of remote Markdown sources.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Append the body at `url` to `sink` chunk by chunk as it arrives.
    /// Bytes received before a failure stay in `sink`.
    async fn fetch(&self, url: &str, sink: &mut Buffer) -> Result<u64, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .redirect(Policy::limited(10))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, sink: &mut Buffer) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "remote source answered with a non-success status");
        }

        let mut received = 0;
        while let Some(chunk) = response.chunk().await? {
            sink.append(&chunk)?;
            received += chunk.len() as u64;
        }
        Ok(received)
    }
}
