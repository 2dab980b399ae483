//! Error types for the scrape / store / serve pipeline

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Page source never contained price rows within the render timeout
    #[error("Price rows did not render within {waited:?}")]
    RenderTimeout { waited: Duration },

    /// Page load exceeded the browser's page-load timeout
    #[error("Page load timeout")]
    Timeout,

    /// Page loaded but held no price rows
    #[error("Price rows not present in page")]
    RenderNotReady,

    /// The WebDriver endpoint rejected a command
    #[error("WebDriver error: {0}")]
    WebDriver(String),

    /// Unexpected response shape or status
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors that can occur when turning page content into records
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Page contained no row that parsed into a record
    #[error("No valid market rows found")]
    NoRecords,

    /// The configured row selector is not valid CSS
    #[error("Invalid row selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Errors that can occur when persisting a snapshot
#[derive(Debug, Error)]
pub enum StoreWriteError {
    /// Refused to replace a good snapshot with an empty one
    #[error("Refusing to write an empty snapshot")]
    EmptySnapshot,

    /// Filesystem failure (disk full, permissions, ...)
    #[error("Snapshot write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Records could not be serialized
    #[error("Snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that can occur when loading the persisted snapshot
#[derive(Debug, Error)]
pub enum StoreReadError {
    /// No snapshot has been written yet
    #[error("Snapshot file not found: {}", path.display())]
    Missing { path: PathBuf },

    /// File exists but is not a valid record array
    #[error("Snapshot file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Any other filesystem failure
    #[error("Snapshot read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreReadError {
    /// True when the caller should report "no data yet" rather than a fault
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreReadError::Missing { .. })
    }
}

/// Any failure of a single scrape cycle
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Store(#[from] StoreWriteError),

    /// The blocking store task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScrapeError {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Fetch(_) => "fetch",
            ScrapeError::Extraction(_) => "extraction",
            ScrapeError::Store(_) => "store_write",
            ScrapeError::Internal(_) => "internal",
        }
    }
}
