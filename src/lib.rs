//! # Market Snapshot Scraper
//!
//! Scrapes a cryptocurrency market listing page (pair, price, 24h change),
//! keeps the latest snapshot in a JSON file replaced atomically, and serves
//! it over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! UpdateLoop (every 2-5s, fixed retry delay on failure)
//!     ↓
//! PageFetcher (headless browser via WebDriver, or plain HTTP)
//!     ↓
//! Extractor (CSS row selector → MarketRecord)
//!     ↓
//! SnapshotStore (temp file + rename)
//!     ↑
//! API server (GET /latest, /health, /htmlpage)
//! ```
//!
//! The loop and the server share nothing but the snapshot file, so a slow
//! scrape never blocks a read.
//!
//! ## Usage
//!
//! ```no_run
//! use market_scraper::{SnapshotStore, StoreReadError};
//!
//! let store = SnapshotStore::new("crypto_data.json");
//! match store.read() {
//!     Ok(snapshot) => {
//!         for record in &snapshot.records {
//!             println!("{} {} {}", record.pair, record.price, record.change_24h);
//!         }
//!     }
//!     Err(StoreReadError::Missing { .. }) => println!("no data yet"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod fetchers;
pub mod metrics;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod updater;

// Re-export commonly used types
pub use error::{ExtractionError, FetchError, ScrapeError, StoreReadError, StoreWriteError};
pub use extractor::Extractor;
pub use fetcher::PageFetcher;
pub use metrics::{CycleMetrics, MetricsCollector};
pub use store::SnapshotStore;
pub use types::{MarketRecord, Snapshot};
pub use updater::{LoopState, UpdateLoop};
