//! Update loop driving fetch → extract → store
//!
//! The loop is an explicit two-state machine. `Scraping` runs one cycle and
//! always moves to `Waiting`; `Waiting` sleeps on the tokio clock and moves
//! back to `Scraping`. Failures never end the loop, they only pick the
//! shorter or longer wait.

use crate::{
    constants::{DEFAULT_INTERVAL_SECS, DEFAULT_RETRY_DELAY_SECS},
    error::ScrapeError,
    extractor::Extractor,
    fetcher::PageFetcher,
    metrics::MetricsCollector,
    store::SnapshotStore,
    types::Snapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// State of the update loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// About to run a scrape cycle
    Scraping,
    /// Sleeping before the next cycle
    Waiting(Duration),
}

/// Periodically scrapes the target page into the snapshot store
///
/// # Example
/// ```no_run
/// use market_scraper::{Extractor, SnapshotStore, UpdateLoop};
/// use market_scraper::fetchers::WebDriverFetcher;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = Extractor::new("div.overview-table-row")?;
/// let fetcher = Arc::new(WebDriverFetcher::new("http://localhost:9515", extractor.clone())?);
/// let store = Arc::new(SnapshotStore::new("crypto_data.json"));
///
/// let updater = UpdateLoop::new(fetcher, extractor, store, "https://www.binance.com/en/markets");
/// let count = updater.run_cycle().await?;
/// println!("stored {} pairs", count);
/// # Ok(())
/// # }
/// ```
pub struct UpdateLoop {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Extractor,
    store: Arc<SnapshotStore>,
    metrics: Arc<MetricsCollector>,
    target_url: String,
    interval: Duration,
    retry_delay: Duration,
}

impl UpdateLoop {
    /// Creates an update loop with the default interval and retry delay
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Extractor,
        store: Arc<SnapshotStore>,
        target_url: impl Into<String>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new(fetcher.fetcher_name()));

        Self {
            fetcher,
            extractor,
            store,
            metrics,
            target_url: target_url.into(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }

    /// Wait after a successful cycle
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Wait after a failed cycle
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Metrics shared with the API server
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Runs one fetch → extract → store cycle
    ///
    /// # Returns
    /// The number of records written. On error the stored snapshot is left as it was.
    pub async fn run_cycle(&self) -> Result<usize, ScrapeError> {
        let html = self.fetcher.fetch(&self.target_url).await?;
        let records = self.extractor.extract(&html)?;
        let snapshot = Snapshot::new(records);
        let count = snapshot.len();

        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.write(&snapshot))
            .await
            .map_err(|e| ScrapeError::Internal(e.to_string()))??;

        Ok(count)
    }

    /// Advances the state machine by one transition
    pub async fn step(&self, state: LoopState) -> LoopState {
        match state {
            LoopState::Scraping => {
                let start = Instant::now();
                match self.run_cycle().await {
                    Ok(count) => {
                        tracing::info!(
                            count,
                            fetcher = self.fetcher.fetcher_name(),
                            latency_ms = start.elapsed().as_millis() as u64,
                            "Snapshot updated"
                        );
                        self.metrics.record_success(start.elapsed()).await;
                        LoopState::Waiting(self.interval)
                    }
                    Err(e) => {
                        tracing::warn!(
                            kind = e.kind(),
                            error = %e,
                            retry_in_secs = self.retry_delay.as_secs_f64(),
                            "Scrape cycle failed, keeping previous snapshot"
                        );
                        self.metrics
                            .record_failure(start.elapsed(), e.to_string())
                            .await;
                        LoopState::Waiting(self.retry_delay)
                    }
                }
            }
            LoopState::Waiting(delay) => {
                sleep(delay).await;
                LoopState::Scraping
            }
        }
    }

    /// Runs the loop until `shutdown` becomes true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            target_url = %self.target_url,
            interval_secs = self.interval.as_secs_f64(),
            retry_delay_secs = self.retry_delay.as_secs_f64(),
            fetcher = self.fetcher.fetcher_name(),
            "Starting update loop"
        );

        let mut state = LoopState::Scraping;
        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                next = self.step(state) => state = next,
            }
        }

        tracing::info!("Update loop stopped");
    }

    /// Spawns the loop on the current runtime
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
