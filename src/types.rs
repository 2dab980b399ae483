//! Types for the market snapshot scraper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One trading pair's row as displayed on the listing page
///
/// Prices and changes are kept in their displayed string form; the page
/// formats them (thousands separators, signs, percent) and nothing here
/// needs numeric values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Trading pair, e.g. "BTC/USDT"
    pub pair: String,

    /// Last price as displayed
    pub price: String,

    /// 24h change as displayed, e.g. "+1.35%"
    pub change_24h: String,

    /// 24h volume, when the row carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<String>,

    /// Market cap, when the row carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<String>,

    /// Position in the listing (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl MarketRecord {
    /// Create a record with only the required fields
    pub fn new(
        pair: impl Into<String>,
        price: impl Into<String>,
        change_24h: impl Into<String>,
    ) -> Self {
        Self {
            pair: pair.into(),
            price: price.into(),
            change_24h: change_24h.into(),
            volume_24h: None,
            market_cap: None,
            rank: None,
        }
    }
}

/// The complete set of records captured in one scrape cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// When the page was scraped
    pub captured_at: DateTime<Utc>,

    /// Records in listing order
    pub records: Vec<MarketRecord>,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(records: Vec<MarketRecord>) -> Self {
        Self::captured_at(Utc::now(), records)
    }

    /// Create a snapshot with an explicit capture time
    pub fn captured_at(captured_at: DateTime<Utc>, records: Vec<MarketRecord>) -> Self {
        Self {
            captured_at,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the age of the snapshot
    pub fn age(&self) -> std::time::Duration {
        let now = Utc::now();
        let duration = now.signed_duration_since(self.captured_at);
        duration.to_std().unwrap_or_default()
    }

    /// Check if the snapshot is older than `threshold`
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        self.age() > threshold
    }
}

/// Body of a successful `GET /latest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestResponse {
    /// Scrape time of the served snapshot (RFC 3339)
    pub timestamp: DateTime<Utc>,
    pub count: usize,
    pub data: Vec<MarketRecord>,
}

impl From<Snapshot> for LatestResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            timestamp: snapshot.captured_at,
            count: snapshot.records.len(),
            data: snapshot.records,
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// A fresh snapshot is being served
    Healthy,
    /// A snapshot is served but it is stale
    Degraded,
    /// No snapshot is available
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
