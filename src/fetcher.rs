//! Fetcher abstraction for loading rendered market listing pages

use crate::error::FetchError;
use async_trait::async_trait;

/// Trait for page fetchers
///
/// Implementations return the page's HTML once price rows are present
/// (a headless browser via WebDriver, a plain HTTP GET, ...). Any resources
/// acquired for a fetch must be released before `fetch` returns, whatever
/// the outcome.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the rendered content of `url`
    ///
    /// # Arguments
    /// * `url` - The market listing page to load
    ///
    /// # Returns
    /// The page HTML, or an error if loading or rendering failed or timed out
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Returns the name of this fetcher
    fn fetcher_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock fetcher replaying scripted responses in order
    ///
    /// Once the script runs out every fetch fails with `RenderNotReady`.
    pub struct MockFetcher {
        responses: Arc<Mutex<VecDeque<Result<String, FetchError>>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl Default for MockFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self {
                responses: Arc::new(Mutex::new(VecDeque::new())),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn push_page(&self, html: impl Into<String>) {
            self.responses.lock().unwrap().push_back(Ok(html.into()));
        }

        pub fn push_error(&self, error: FetchError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            *self.call_count.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::RenderNotReady))
        }

        fn fetcher_name(&self) -> &'static str {
            "mock"
        }
    }
}
