//! Runtime configuration from CLI flags and environment variables
//!
//! Every setting falls back to the defaults in `constants`. A `.env` file in
//! the working directory is loaded by the binary before parsing.

use crate::constants::{
    DEFAULT_BACKUP_FILE, DEFAULT_BIND_ADDR, DEFAULT_INTERVAL_SECS, DEFAULT_OUTPUT_FILE,
    DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_RENDER_TIMEOUT_SECS,
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_ROW_SELECTOR, DEFAULT_STALE_AFTER_SECS,
    DEFAULT_TARGET_URL, DEFAULT_WEBDRIVER_URL, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Which page fetcher drives the update loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetcherKind {
    /// Headless Chrome through a WebDriver server
    Webdriver,
    /// Single HTTP GET, for server-rendered pages
    Http,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "market-scraper", version, about)]
pub struct Config {
    /// Market listing page to scrape
    #[arg(long, env = "TARGET_URL", default_value = DEFAULT_TARGET_URL)]
    pub target_url: String,

    /// CSS selector matching one trading-pair row
    #[arg(long, env = "ROW_SELECTOR", default_value = DEFAULT_ROW_SELECTOR)]
    pub row_selector: String,

    /// Seconds between successful scrapes
    #[arg(
        long,
        env = "SCRAPE_INTERVAL_SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS)
    )]
    pub interval_secs: u64,

    /// Seconds to wait before retrying a failed scrape
    #[arg(
        long,
        env = "RETRY_DELAY_SECS",
        default_value_t = DEFAULT_RETRY_DELAY_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub retry_delay_secs: u64,

    /// Upper bound on waiting for price rows to render
    #[arg(long, env = "RENDER_TIMEOUT_SECS", default_value_t = DEFAULT_RENDER_TIMEOUT_SECS)]
    pub render_timeout_secs: u64,

    /// Browser page-load timeout
    #[arg(long, env = "PAGE_LOAD_TIMEOUT_SECS", default_value_t = DEFAULT_PAGE_LOAD_TIMEOUT_SECS)]
    pub page_load_timeout_secs: u64,

    /// Snapshot file, relative to the working directory
    #[arg(long, env = "OUTPUT_FILE", default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Copy of the previous snapshot
    #[arg(long, env = "BACKUP_FILE", default_value = DEFAULT_BACKUP_FILE)]
    pub backup: PathBuf,

    /// Do not keep a backup of the previous snapshot
    #[arg(long)]
    pub no_backup: bool,

    /// Keep at most this many rows per snapshot
    #[arg(long, env = "MAX_ROWS")]
    pub max_rows: Option<usize>,

    #[arg(long, env = "PAGE_FETCHER", value_enum, default_value = "webdriver")]
    pub fetcher: FetcherKind,

    /// WebDriver server (e.g. chromedriver)
    #[arg(long, env = "WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    pub webdriver_url: String,

    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Snapshot age after which /health reports degraded
    #[arg(long, env = "STALE_AFTER_SECS", default_value_t = DEFAULT_STALE_AFTER_SECS)]
    pub stale_after_secs: u64,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn backup_path(&self) -> Option<PathBuf> {
        (!self.no_backup).then(|| self.backup.clone())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
