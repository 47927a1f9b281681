//! Wide comparison table: one field across several companies.
//!
//! Companies are joined on the union of their dates. A company with no quote
//! on a date gets NaN there (no forward-fill).

use crate::data::DataError;
use crate::domain::{Company, Field};
use crate::window::{peak, peak_normalize};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

/// Column-aligned view of one field, one column per ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Column names, in selection order.
    pub tickers: Vec<String>,
    /// `columns[i]` belongs to `tickers[i]` and has one value per date.
    pub columns: Vec<Vec<f64>>,
    pub field: Field,
    pub normalized: bool,
}

impl ComparisonTable {
    /// Outer-join `field` of every company on date.
    ///
    /// With `normalize`, each column is divided by its own maximum.
    pub fn build(
        companies: &[&Company],
        field: Field,
        normalize: bool,
    ) -> Result<Self, DataError> {
        let all_dates: BTreeSet<NaiveDate> = companies
            .iter()
            .flat_map(|c| c.table().dates())
            .collect();
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

        let mut tickers = Vec::with_capacity(companies.len());
        let mut columns = Vec::with_capacity(companies.len());

        for company in companies {
            let by_date: HashMap<NaiveDate, f64> = company
                .table()
                .iter()
                .map(|(date, quote)| (date, quote.get(field)))
                .collect();

            let mut column: Vec<f64> = dates
                .iter()
                .map(|date| by_date.get(date).copied().unwrap_or(f64::NAN))
                .collect();

            if normalize {
                column = match peak_normalize(&column) {
                    Some((normalized, _)) => normalized,
                    None => {
                        return Err(DataError::DegeneratePeak {
                            ticker: company.ticker().to_string(),
                            field,
                            peak: peak(&column),
                        })
                    }
                };
            }

            tickers.push(company.ticker().to_string());
            columns.push(column);
        }

        Ok(Self {
            dates,
            tickers,
            columns,
            field,
            normalized: normalize,
        })
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The column for `ticker`, if it was selected.
    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// Write as CSV: `date,<ticker>...`, empty cells for missing values.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DataError> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.tickers.len() + 1);
        header.push("date".to_string());
        header.extend(self.tickers.iter().cloned());
        wtr.write_record(&header)
            .map_err(|e| DataError::Export(format!("CSV header: {e}")))?;

        for (row, date) in self.dates.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            for column in &self.columns {
                let value = column[row];
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                });
            }
            wtr.write_record(&record)
                .map_err(|e| DataError::Export(format!("CSV row {date}: {e}")))?;
        }

        wtr.flush()
            .map_err(|e| DataError::Export(format!("CSV flush: {e}")))?;
        Ok(())
    }
}
