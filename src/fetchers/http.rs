//! Plain HTTP fetcher for listing pages rendered server-side

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::FetchError,
    extractor::Extractor,
    fetcher::PageFetcher,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Fetches pages with a single GET, no script execution
pub struct HttpFetcher {
    client: Client,
    extractor: Extractor,
}

impl HttpFetcher {
    /// Creates a new HTTP fetcher
    pub fn new(extractor: Extractor) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::NetworkError)?;

        Ok(Self { client, extractor })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url, "Fetching page over HTTP");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::NetworkError)?;

        if !response.status().is_success() {
            return Err(FetchError::InvalidResponse(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await.map_err(FetchError::NetworkError)?;

        if !self.extractor.has_rows(&html) {
            return Err(FetchError::RenderNotReady);
        }

        Ok(html)
    }

    fn fetcher_name(&self) -> &'static str {
        "http"
    }
}
