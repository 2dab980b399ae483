//! Turns rendered listing HTML into market records

use crate::{error::ExtractionError, types::MarketRecord};
use scraper::{ElementRef, Html, Selector};

/// Minimum number of text cells a row needs: pair, price, change
const REQUIRED_CELLS: usize = 3;

/// Parses listing rows into [`MarketRecord`]s
///
/// Each element matched by the row selector is one trading pair. Its
/// non-empty text nodes, in document order, are the row's cells: pair,
/// price and 24h change, optionally followed by volume and market cap.
#[derive(Debug, Clone)]
pub struct Extractor {
    row_selector: Selector,
    max_rows: Option<usize>,
}

impl Extractor {
    /// Creates an extractor for the given CSS row selector
    pub fn new(row_selector: &str) -> Result<Self, ExtractionError> {
        let selector =
            Selector::parse(row_selector).map_err(|e| ExtractionError::InvalidSelector {
                selector: row_selector.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            row_selector: selector,
            max_rows: None,
        })
    }

    /// Stops extraction after `max_rows` valid records
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// True if the page contains at least one element matching the row selector
    ///
    /// Used by fetchers to decide whether the page has finished rendering.
    pub fn has_rows(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        let found = document.select(&self.row_selector).next().is_some();
        found
    }

    /// Extracts all valid records from the page
    ///
    /// Malformed rows are skipped. Fails with [`ExtractionError::NoRecords`]
    /// when nothing valid remains, so callers never persist an empty snapshot.
    pub fn extract(&self, html: &str) -> Result<Vec<MarketRecord>, ExtractionError> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in document.select(&self.row_selector) {
            if self.max_rows.is_some_and(|max| records.len() >= max) {
                break;
            }

            match parse_row(row) {
                Some(mut record) => {
                    record.rank = Some(records.len() as u32 + 1);
                    records.push(record);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, kept = records.len(), "Skipped malformed rows");
        }

        if records.is_empty() {
            return Err(ExtractionError::NoRecords);
        }

        Ok(records)
    }
}

fn parse_row(row: ElementRef<'_>) -> Option<MarketRecord> {
    let cells: Vec<String> = row
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if cells.len() < REQUIRED_CELLS {
        return None;
    }

    let mut cells = cells.into_iter();
    let pair = cells.next()?;
    let price = cells.next()?;
    let change_24h = cells.next()?;

    Some(MarketRecord {
        pair,
        price,
        change_24h,
        volume_24h: cells.next(),
        market_cap: cells.next(),
        rank: None,
    })
}
