//! QuoteTable: one ticker's date-indexed daily series.

use super::quote::{Field, Quote};
use crate::data::DataError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Chronologically ordered daily quotes, at most one row per date.
///
/// Immutable once built: every constructor validates uniqueness and the
/// BTreeMap keeps the index sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteTable {
    rows: BTreeMap<NaiveDate, Quote>,
}

impl QuoteTable {
    /// Build a table from rows in any order. Duplicate dates are rejected.
    pub fn from_rows<I>(rows: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = (NaiveDate, Quote)>,
    {
        let mut map = BTreeMap::new();
        for (date, quote) in rows {
            if map.insert(date, quote).is_some() {
                return Err(DataError::DuplicateDate { date });
            }
        }
        Ok(Self { rows: map })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Quote> {
        self.rows.get(&date)
    }

    /// Rows in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Quote)> + '_ {
        self.rows.iter().map(|(d, q)| (*d, q))
    }

    /// The date index, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// One column as a dense vector in date order.
    pub fn column(&self, field: Field) -> Vec<f64> {
        self.rows.values().map(|q| q.get(field)).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }
}
