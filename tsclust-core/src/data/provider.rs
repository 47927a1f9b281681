//! Quote provider trait and structured error types.
//!
//! The QuoteProvider trait abstracts over the market-data source so the
//! collection can be filled from Alpha Vantage in production and from an
//! in-memory mock in tests.

use crate::domain::{Field, QuoteTable};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("symbol not found: {symbol} ({message})")]
    SymbolNotFound { symbol: String, message: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("duplicate date {date} in quote table")]
    DuplicateDate { date: NaiveDate },

    #[error("no rows for '{ticker}'")]
    EmptySeries { ticker: String },

    #[error("cannot normalize '{field}' for '{ticker}': peak value is {peak}")]
    DegeneratePeak {
        ticker: String,
        field: Field,
        peak: f64,
    },

    #[error("window size must be positive")]
    InvalidWindow,

    #[error("ragged image for '{ticker}': expected shape {expected:?}, found {found:?}")]
    RaggedImages {
        ticker: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("collection is empty")]
    EmptyCollection,

    #[error("snapshot error: {0}")]
    Store(String),

    #[error("export error: {0}")]
    Export(String),
}

/// Trait for daily quote sources.
///
/// One call is one request: implementations must not retry internally. The
/// acquisition layer above decides what to do with failures.
pub trait QuoteProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the daily quote table for a ticker.
    fn fetch(&self, ticker: &str) -> Result<QuoteTable, DataError>;
}

/// Progress callback for multi-ticker acquisition.
pub trait AcquisitionProgress {
    /// Called before fetching a ticker. `round` is 0 for the first pass.
    fn on_start(&self, ticker: &str, index: usize, total: usize, round: usize);

    /// Called when a ticker fetch completes.
    fn on_complete(&self, ticker: &str, round: usize, result: &Result<usize, DataError>);

    /// Called after each pass over the pending tickers.
    fn on_round_complete(&self, round: usize, acquired: usize, skipped: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl AcquisitionProgress for LogProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize, round: usize) {
        info!(ticker, round, "[{}/{}] acquiring", index + 1, total);
    }

    fn on_complete(&self, ticker: &str, round: usize, result: &Result<usize, DataError>) {
        match result {
            Ok(rows) => info!(ticker, round, rows, "acquired"),
            Err(e) => warn!(ticker, round, error = %e, "skipped"),
        }
    }

    fn on_round_complete(&self, round: usize, acquired: usize, skipped: usize) {
        info!(round, acquired, skipped, "acquisition round complete");
    }
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl AcquisitionProgress for NoProgress {
    fn on_start(&self, _ticker: &str, _index: usize, _total: usize, _round: usize) {}

    fn on_complete(&self, _ticker: &str, _round: usize, _result: &Result<usize, DataError>) {}

    fn on_round_complete(&self, _round: usize, _acquired: usize, _skipped: usize) {}
}
