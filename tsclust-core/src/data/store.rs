//! JSON snapshot of a company collection.
//!
//! Layout: `{ TICKER: { "YYYY-MM-DD": { close, high, low, open, volume } } }`
//!
//! - Keys are sorted at every level and the document is indented with four
//!   spaces, so identical data always produces identical bytes.
//! - Writes are atomic (write to .tmp, rename into place).
//! - Missing values are written as `null` and read back as NaN.
//! - Date keys with a trailing time (`"2024-01-02 00:00:00"`) are accepted.
//! - Field-first documents (`{ TICKER: { "close": { date: value } } }`, the
//!   layout pandas `DataFrame.to_json` writes) are transposed on load.

use super::provider::DataError;
use crate::domain::{Company, Field, Quote, QuoteTable};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Values of one row as read from disk, keyed by field name; `null` allowed.
type RawRow = BTreeMap<String, Option<f64>>;

fn quote_from_raw(row: &RawRow) -> Quote {
    let value = |field: Field| -> f64 {
        row.get(field.as_str())
            .copied()
            .flatten()
            .unwrap_or(f64::NAN)
    };
    Quote {
        open: value(Field::Open),
        high: value(Field::High),
        low: value(Field::Low),
        close: value(Field::Close),
        volume: value(Field::Volume),
    }
}

type Document<R> = BTreeMap<String, BTreeMap<String, R>>;

/// Render companies as the pretty-printed, key-sorted snapshot document.
pub fn to_json(companies: &[Company]) -> Result<String, DataError> {
    let mut doc: Document<BTreeMap<&'static str, f64>> = BTreeMap::new();
    for company in companies {
        let rows: BTreeMap<String, BTreeMap<&'static str, f64>> = company
            .table()
            .iter()
            .map(|(date, quote)| {
                let fields: BTreeMap<&'static str, f64> = Field::ALL
                    .iter()
                    .map(|f| (f.as_str(), quote.get(*f)))
                    .collect();
                (date.format("%Y-%m-%d").to_string(), fields)
            })
            .collect();
        doc.insert(company.ticker().to_string(), rows);
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)
        .map_err(|e| DataError::Store(format!("serialize snapshot: {e}")))?;
    String::from_utf8(buf).map_err(|e| DataError::Store(format!("snapshot encoding: {e}")))
}

/// Parse a snapshot document back into companies, in ticker order.
///
/// Each ticker may be date-first (as [`to_json`] writes) or field-first.
pub fn from_json(content: &str) -> Result<Vec<Company>, DataError> {
    let doc: Document<RawRow> = serde_json::from_str(content)
        .map_err(|e| DataError::Store(format!("parse snapshot: {e}")))?;

    doc.into_iter()
        .map(|(ticker, outer)| -> Result<Company, DataError> {
            let by_date = if is_field_first(&outer) {
                transpose(outer)
            } else {
                outer
            };
            let rows = by_date
                .iter()
                .map(|(key, row)| -> Result<(NaiveDate, Quote), DataError> {
                    Ok((parse_date_key(key)?, quote_from_raw(row)))
                })
                .collect::<Result<Vec<_>, DataError>>()?;
            Ok(Company::new(ticker, QuoteTable::from_rows(rows)?))
        })
        .collect()
}

fn is_field_first(outer: &BTreeMap<String, RawRow>) -> bool {
    !outer.is_empty()
        && outer
            .keys()
            .all(|key| Field::ALL.iter().any(|f| f.as_str() == key.as_str()))
}

/// `{field: {date: v}}` into `{date: {field: v}}`.
fn transpose(by_field: BTreeMap<String, RawRow>) -> BTreeMap<String, RawRow> {
    let mut by_date: BTreeMap<String, RawRow> = BTreeMap::new();
    for (field, column) in by_field {
        for (date, value) in column {
            by_date.entry(date).or_default().insert(field.clone(), value);
        }
    }
    by_date
}

/// Write the snapshot to `path` atomically.
pub fn save(path: &Path, companies: &[Company]) -> Result<(), DataError> {
    let json = to_json(companies)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| DataError::Store(format!("failed to create dir: {e}")))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .map_err(|e| DataError::Store(format!("write {}: {e}", tmp_path.display())))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Store(format!("atomic rename failed: {e}"))
    })
}

/// Read a snapshot written by [`save`].
pub fn load(path: &Path) -> Result<Vec<Company>, DataError> {
    let content = fs::read_to_string(path)
        .map_err(|e| DataError::Store(format!("read {}: {e}", path.display())))?;
    from_json(&content)
}

fn parse_date_key(key: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|e| DataError::Store(format!("invalid date key '{key}': {e}")))
}
