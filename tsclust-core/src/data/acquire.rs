//! Bulk acquisition: fetch many tickers, retrying the failures.
//!
//! A failed fetch never aborts the batch: the ticker is parked in the skip
//! set after a fixed sleep. After the first pass the skip set is retried for
//! at most `max_retries` rounds, stopping early once it is empty.

use super::provider::{AcquisitionProgress, QuoteProvider};
use crate::config::AcquisitionConfig;
use crate::domain::Company;
use std::time::Duration;

/// How hard to retry failed tickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry rounds after the first pass.
    pub max_retries: usize,
    /// Blocking sleep after every failed fetch.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AcquisitionConfig::default())
    }
}

impl From<&AcquisitionConfig> for RetryPolicy {
    fn from(cfg: &AcquisitionConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            retry_delay: cfg.retry_delay(),
        }
    }
}

/// Outcome of a bulk acquisition.
#[derive(Debug)]
pub struct Acquisition {
    /// Companies fetched successfully, in the order they succeeded.
    pub companies: Vec<Company>,
    /// Tickers still failing after the retry budget ran out.
    pub skipped: Vec<String>,
    /// Retry rounds actually run (0 when the first pass fetched everything).
    pub retry_rounds: usize,
}

impl Acquisition {
    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Fetch every ticker, then retry the skip set up to `policy.max_retries` times.
pub fn acquire<S: AsRef<str>>(
    provider: &dyn QuoteProvider,
    tickers: &[S],
    policy: &RetryPolicy,
    progress: &dyn AcquisitionProgress,
) -> Acquisition {
    let pending: Vec<String> = tickers.iter().map(|t| t.as_ref().to_string()).collect();
    let (mut companies, mut skipped) = fetch_pass(provider, &pending, policy, 0, progress);

    let mut retry_rounds = 0;
    while !skipped.is_empty() && retry_rounds < policy.max_retries {
        retry_rounds += 1;
        let (fetched, still_skipped) =
            fetch_pass(provider, &skipped, policy, retry_rounds, progress);
        companies.extend(fetched);
        skipped = still_skipped;
    }

    Acquisition {
        companies,
        skipped,
        retry_rounds,
    }
}

/// One pass over `tickers`: returns (fetched, skipped).
fn fetch_pass(
    provider: &dyn QuoteProvider,
    tickers: &[String],
    policy: &RetryPolicy,
    round: usize,
    progress: &dyn AcquisitionProgress,
) -> (Vec<Company>, Vec<String>) {
    let total = tickers.len();
    let mut fetched = Vec::with_capacity(total);
    let mut skipped = Vec::new();

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total, round);

        match Company::fetch(provider, ticker) {
            Ok(company) => {
                progress.on_complete(ticker, round, &Ok(company.len()));
                fetched.push(company);
            }
            Err(e) => {
                progress.on_complete(ticker, round, &Err(e));
                if !policy.retry_delay.is_zero() {
                    std::thread::sleep(policy.retry_delay);
                }
                skipped.push(ticker.clone());
            }
        }
    }

    progress.on_round_complete(round, fetched.len(), skipped.len());
    (fetched, skipped)
}
