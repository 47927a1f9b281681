//! Company: a ticker and its daily quote table.

use super::quote::Field;
use super::table::QuoteTable;
use crate::data::{DataError, QuoteProvider};
use crate::window::{peak, peak_normalize, split_into_windows};
use chrono::NaiveDate;
use ndarray::Array2;
use std::fmt;

/// One ticker's time series.
#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    ticker: String,
    table: QuoteTable,
}

impl Company {
    /// Wrap an already-built table.
    pub fn new(ticker: impl Into<String>, table: QuoteTable) -> Self {
        Self {
            ticker: ticker.into(),
            table,
        }
    }

    /// Fetch the table for `ticker` from a provider (one request, no retry).
    pub fn fetch(provider: &dyn QuoteProvider, ticker: &str) -> Result<Self, DataError> {
        let table = provider.fetch(ticker)?;
        Ok(Self::new(ticker, table))
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn table(&self) -> &QuoteTable {
        &self.table
    }

    /// Number of observed trading days.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.table.first_date()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.table.last_date()
    }

    /// The column divided by its own maximum, so the peak becomes 1.0.
    ///
    /// An all-zero column has no usable peak and is reported as
    /// [`DataError::DegeneratePeak`] rather than filling the output with NaN.
    pub fn normalized_column(&self, field: Field) -> Result<Vec<f64>, DataError> {
        if self.table.is_empty() {
            return Err(DataError::EmptySeries {
                ticker: self.ticker.clone(),
            });
        }

        let column = self.table.column(field);
        match peak_normalize(&column) {
            Some((normalized, _)) => Ok(normalized),
            None => Err(DataError::DegeneratePeak {
                ticker: self.ticker.clone(),
                field,
                peak: peak(&column),
            }),
        }
    }

    /// Normalized column reshaped into `(len / window, window)`.
    ///
    /// Fewer than `window` rows (none at all included) gives `(0, window)`.
    pub fn windowed(&self, field: Field, window: usize) -> Result<Array2<f64>, DataError> {
        if window == 0 {
            return Err(DataError::InvalidWindow);
        }
        if self.len() < window {
            return Ok(Array2::zeros((0, window)));
        }
        let normalized = self.normalized_column(field)?;
        split_into_windows(&normalized, window)
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quote;

    fn company(ticker: &str, closes: &[f64]) -> Company {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = closes.iter().enumerate().map(|(i, &close)| {
            (
                start + chrono::Duration::days(i as i64),
                Quote {
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 0.0,
                },
            )
        });
        Company::new(ticker, QuoteTable::from_rows(rows).unwrap())
    }

    #[test]
    fn normalized_peak_is_one() {
        let c = company("AAPL", &[50.0, 200.0, 100.0]);
        assert_eq!(c.normalized_column(Field::Close).unwrap(), vec![0.25, 1.0, 0.5]);
    }

    #[test]
    fn all_zero_column_is_an_error() {
        let c = company("AAPL", &[1.0, 2.0]);
        let err = c.normalized_column(Field::Volume).unwrap_err();
        assert!(matches!(err, DataError::DegeneratePeak { peak, .. } if peak == 0.0));
    }

    #[test]
    fn empty_company_is_an_error() {
        let c = Company::new("NONE", QuoteTable::default());
        assert!(matches!(
            c.normalized_column(Field::Close),
            Err(DataError::EmptySeries { .. })
        ));
    }

    #[test]
    fn windowed_shape_and_order() {
        let closes: Vec<f64> = (1..=15).map(f64::from).collect();
        let img = company("MSFT", &closes).windowed(Field::Close, 7).unwrap();

        assert_eq!(img.dim(), (2, 7));
        assert_eq!(img[[0, 0]], 1.0 / 15.0);
        assert_eq!(img[[1, 6]], 14.0 / 15.0);
    }

    #[test]
    fn windowed_short_series_is_empty() {
        let img = company("MSFT", &[1.0, 2.0, 3.0]).windowed(Field::Close, 7).unwrap();
        assert_eq!(img.dim(), (0, 7));
    }

    #[test]
    fn windowed_without_rows_is_empty() {
        let c = Company::new("EMPTY", QuoteTable::default());
        assert_eq!(c.windowed(Field::Close, 7).unwrap().dim(), (0, 7));
        assert!(matches!(
            c.windowed(Field::Close, 0),
            Err(DataError::InvalidWindow)
        ));
    }

    #[test]
    fn windowed_short_zero_series_skips_peak_check() {
        let c = company("FLAT", &[1.0, 2.0]);
        assert_eq!(c.windowed(Field::Volume, 7).unwrap().dim(), (0, 7));
    }

    #[test]
    fn display_is_ticker() {
        assert_eq!(company("GOOG", &[1.0]).to_string(), "GOOG");
    }
}
