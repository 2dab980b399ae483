//! Constants for the market snapshot scraper
//!
//! Default values for every runtime setting are centralized here. The CLI
//! layer in `config` falls back to these when no flag or environment
//! variable overrides them.

/// Market listing page scraped by default
pub const DEFAULT_TARGET_URL: &str = "https://www.binance.com/en/markets";

/// CSS selector matching one rendered trading-pair row
pub const DEFAULT_ROW_SELECTOR: &str = "div.overview-table-row";

/// How often to scrape after a successful cycle (in seconds)
pub const DEFAULT_INTERVAL_SECS: u64 = 2;

/// Lower bound for the scrape interval (in seconds)
pub const MIN_INTERVAL_SECS: u64 = 2;

/// Upper bound for the scrape interval (in seconds)
pub const MAX_INTERVAL_SECS: u64 = 5;

/// Fixed delay before retrying after a failed cycle (in seconds)
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Upper bound on waiting for price rows to render (in seconds)
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;

/// Browser page-load timeout (in seconds)
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// How often the rendered source is polled while waiting for rows (in milliseconds)
pub const RENDER_POLL_INTERVAL_MS: u64 = 250;

/// HTTP request timeout for WebDriver commands and plain fetches (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 45;

/// Snapshot file, relative to the working directory
pub const DEFAULT_OUTPUT_FILE: &str = "crypto_data.json";

/// Copy of the previous snapshot kept next to the live file
pub const DEFAULT_BACKUP_FILE: &str = "crypto_data_backup.json";

/// Default WebDriver endpoint (chromedriver's default port)
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Default listen address for the API server
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default listen port for the API server
pub const DEFAULT_PORT: u16 = 5000;

/// Snapshot age after which `/health` reports degraded (in seconds)
pub const DEFAULT_STALE_AFTER_SECS: u64 = 30;

/// Arguments passed to the headless browser
pub const BROWSER_ARGS: &[&str] = &[
    "--headless",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--log-level=3",
];

/// User agent for HTTP requests
pub const USER_AGENT: &str = "market-scraper/0.1.0";
