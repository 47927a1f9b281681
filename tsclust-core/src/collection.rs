//! Companies: an ordered collection of company time series.
//!
//! Built from exactly one source (explicit companies, tickers to acquire, or
//! a JSON snapshot). Every constructor drops companies with fewer than
//! [`MIN_OBSERVATIONS`] rows, so downstream windowing always has history.

use crate::comparison::ComparisonTable;
use crate::data::{acquire, store, AcquisitionProgress, DataError, QuoteProvider, RetryPolicy};
use crate::domain::{Company, Field};
use ndarray::{Array3, Array4, Axis};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Companies with fewer rows than this never enter a collection.
pub const MIN_OBSERVATIONS: usize = 100;

/// Default window width for image datasets.
pub const DEFAULT_WINDOW: usize = 7;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Companies {
    data: Vec<Company>,
}

impl Companies {
    /// Collection over already-built companies.
    pub fn from_companies(companies: Vec<Company>) -> Self {
        Self {
            data: retain_observed(companies),
        }
    }

    /// Acquire `tickers` from `provider` with retry.
    ///
    /// Returns the collection and the tickers that were still failing when
    /// the retry budget ran out.
    pub fn from_tickers<S: AsRef<str>>(
        provider: &dyn QuoteProvider,
        tickers: &[S],
        policy: &RetryPolicy,
        progress: &dyn AcquisitionProgress,
    ) -> (Self, Vec<String>) {
        info!(
            provider = provider.name(),
            tickers = tickers.len(),
            max_retries = policy.max_retries,
            "acquiring data"
        );
        let acquisition = acquire(provider, tickers, policy, progress);
        (
            Self::from_companies(acquisition.companies),
            acquisition.skipped,
        )
    }

    /// Collection from a JSON snapshot written by [`Companies::save_json`].
    pub fn load_json(path: &Path) -> Result<Self, DataError> {
        let companies = store::load(path)?;
        debug!(path = %path.display(), companies = companies.len(), "loaded snapshot");
        Ok(Self::from_companies(companies))
    }

    /// Write every company to one pretty-printed, key-sorted JSON document.
    pub fn save_json(&self, path: &Path) -> Result<(), DataError> {
        store::save(path, &self.data)?;
        info!(path = %path.display(), companies = self.data.len(), "saved snapshot");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Company> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[Company] {
        &self.data
    }

    /// Company at position `index`.
    pub fn get(&self, index: usize) -> Option<&Company> {
        self.data.get(index)
    }

    /// Every company whose ticker is in `tickers`, in collection order.
    ///
    /// Always a list: callers that expect one match check the length.
    pub fn select<S: AsRef<str>>(&self, tickers: &[S]) -> Vec<&Company> {
        self.data
            .iter()
            .filter(|c| tickers.iter().any(|t| t.as_ref() == c.ticker()))
            .collect()
    }

    /// First company with this ticker.
    pub fn find(&self, ticker: &str) -> Option<&Company> {
        self.data.iter().find(|c| c.ticker() == ticker)
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.data.iter().map(|c| c.ticker()).collect()
    }

    /// Wide table of `field`, one column per company (all when `tickers` is None).
    pub fn comparison_table<S: AsRef<str>>(
        &self,
        tickers: Option<&[S]>,
        field: Field,
        normalize: bool,
    ) -> Result<ComparisonTable, DataError> {
        let companies = match tickers {
            Some(tickers) => self.select(tickers),
            None => self.data.iter().collect(),
        };
        ComparisonTable::build(&companies, field, normalize)
    }

    /// Stack every company's windowed image into `(companies, windows, window)`.
    ///
    /// All companies must produce the same number of windows; a mismatch is
    /// reported as [`DataError::RaggedImages`] naming the first offender.
    pub fn build_image_dataset(
        &self,
        field: Field,
        window: usize,
    ) -> Result<Array3<f64>, DataError> {
        if self.data.is_empty() {
            return Err(DataError::EmptyCollection);
        }
        let images = self
            .data
            .iter()
            .map(|c| c.windowed(field, window))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = images[0].dim();
        for (company, image) in self.data.iter().zip(&images) {
            if image.dim() != expected {
                return Err(DataError::RaggedImages {
                    ticker: company.ticker().to_string(),
                    expected,
                    found: image.dim(),
                });
            }
        }

        let mut dataset = Array3::<f64>::zeros((images.len(), expected.0, expected.1));
        for (mut slot, image) in dataset.outer_iter_mut().zip(&images) {
            slot.assign(image);
        }
        Ok(dataset)
    }

    /// BLAKE3 digest over tickers, dates and every field value.
    ///
    /// Tickers and row lists are length-prefixed so that no two collections
    /// share a hash input.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.data.len() as u64).to_le_bytes());
        for company in &self.data {
            let ticker = company.ticker().as_bytes();
            hasher.update(&(ticker.len() as u64).to_le_bytes());
            hasher.update(ticker);
            hasher.update(&(company.len() as u64).to_le_bytes());
            for (date, quote) in company.table().iter() {
                hasher.update(date.to_string().as_bytes());
                for field in Field::ALL {
                    hasher.update(&quote.get(field).to_le_bytes());
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Add a leading batch axis: `(companies, windows, window)` becomes
/// `(1, companies, windows, window)`, so companies act as channels.
pub fn model_batch(dataset: Array3<f64>) -> Array4<f64> {
    dataset.insert_axis(Axis(0))
}

fn retain_observed(companies: Vec<Company>) -> Vec<Company> {
    let total = companies.len();
    let kept: Vec<Company> = companies
        .into_iter()
        .filter(|c| {
            let keep = c.len() >= MIN_OBSERVATIONS;
            if !keep {
                debug!(
                    ticker = c.ticker(),
                    rows = c.len(),
                    min = MIN_OBSERVATIONS,
                    "dropping company with short history"
                );
            }
            keep
        })
        .collect();
    if kept.len() < total {
        info!(kept = kept.len(), dropped = total - kept.len(), "filtered short histories");
    }
    kept
}

impl fmt::Display for Companies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} companies in the dataset", self.data.len())
    }
}

impl<'a> IntoIterator for &'a Companies {
    type Item = &'a Company;
    type IntoIter = std::slice::Iter<'a, Company>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quote, QuoteTable};
    use chrono::NaiveDate;

    fn company(ticker: &str, rows: usize) -> Company {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let rows = (0..rows).map(|i| {
            let close = 10.0 + i as f64;
            (
                start + chrono::Duration::days(i as i64),
                Quote {
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 100.0 * (i + 1) as f64,
                },
            )
        });
        Company::new(ticker, QuoteTable::from_rows(rows).unwrap())
    }

    #[test]
    fn short_histories_are_dropped() {
        let companies = Companies::from_companies(vec![company("X", 120), company("Y", 50)]);
        assert_eq!(companies.tickers(), vec!["X"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let companies = Companies::from_companies(vec![company("A", 100), company("B", 99)]);
        assert_eq!(companies.tickers(), vec!["A"]);
    }

    #[test]
    fn lookup_by_index_and_ticker() {
        let companies = Companies::from_companies(vec![
            company("AAA", 100),
            company("BBB", 100),
            company("CCC", 100),
        ]);

        assert_eq!(companies.get(1).unwrap().ticker(), "BBB");
        assert!(companies.get(3).is_none());

        let one = companies.select(&["CCC"]);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].ticker(), "CCC");

        let many = companies.select(&["CCC", "AAA", "ZZZ"]);
        let tickers: Vec<&str> = many.iter().map(|c| c.ticker()).collect();
        assert_eq!(tickers, vec!["AAA", "CCC"]);

        assert!(companies.select(&["ZZZ"]).is_empty());
        assert_eq!(companies.find("BBB").unwrap().ticker(), "BBB");
        assert!(companies.find("ZZZ").is_none());
    }

    #[test]
    fn display_and_iteration() {
        let companies = Companies::from_companies(vec![company("AAA", 100), company("BBB", 100)]);
        assert_eq!(companies.to_string(), "2 companies in the dataset");

        let mut seen = Vec::new();
        for c in &companies {
            seen.push(c.ticker().to_string());
        }
        assert_eq!(seen, vec!["AAA", "BBB"]);
    }

    #[test]
    fn image_dataset_stacks_companies() {
        let companies = Companies::from_companies(vec![company("AAA", 105), company("BBB", 105)]);
        let dataset = companies.build_image_dataset(Field::Close, 7).unwrap();

        assert_eq!(dataset.dim(), (2, 15, 7));
        assert_eq!(dataset[[0, 14, 6]], 1.0);

        let batch = model_batch(dataset);
        assert_eq!(batch.dim(), (1, 2, 15, 7));
    }

    #[test]
    fn ragged_images_fail_to_stack() {
        let companies = Companies::from_companies(vec![company("AAA", 105), company("BBB", 112)]);
        let err = companies.build_image_dataset(Field::Close, 7).unwrap_err();
        match err {
            DataError::RaggedImages {
                ticker,
                expected,
                found,
            } => {
                assert_eq!(ticker, "BBB");
                assert_eq!(expected, (15, 7));
                assert_eq!(found, (16, 7));
            }
            other => panic!("expected RaggedImages, got {other:?}"),
        }
    }

    #[test]
    fn empty_collection_has_no_dataset() {
        let companies = Companies::default();
        assert!(matches!(
            companies.build_image_dataset(Field::Close, 7),
            Err(DataError::EmptyCollection)
        ));
    }

    #[test]
    fn comparison_table_over_subset_and_all() {
        let companies = Companies::from_companies(vec![company("AAA", 100), company("BBB", 110)]);

        let all = companies
            .comparison_table::<&str>(None, Field::Close, true)
            .unwrap();
        assert_eq!(all.tickers, vec!["AAA", "BBB"]);
        assert_eq!(all.len(), 110);
        assert!(all.column("AAA").unwrap()[105].is_nan());

        let subset = companies
            .comparison_table(Some(&["BBB"][..]), Field::Volume, false)
            .unwrap();
        assert_eq!(subset.tickers, vec!["BBB"]);
        assert_eq!(subset.column("BBB").unwrap()[0], 100.0);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Companies::from_companies(vec![company("AAA", 100)]);
        let b = Companies::from_companies(vec![company("AAA", 100)]);
        let c = Companies::from_companies(vec![company("AAA", 101)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn fingerprint_separates_ticker_boundaries() {
        let empty = |t: &str| Company::new(t, QuoteTable::default());
        let a = Companies {
            data: vec![empty("AB"), empty("C")],
        };
        let b = Companies {
            data: vec![empty("A"), empty("BC")],
        };
        let c = Companies {
            data: vec![empty("ABC")],
        };
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(b.fingerprint(), c.fingerprint());
    }
}
