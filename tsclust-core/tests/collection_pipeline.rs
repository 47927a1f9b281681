//! Integration tests for the acquisition → collection → dataset → model pipeline.
//!
//! A scripted provider stands in for the network so every scenario is
//! deterministic and runs without sleeping.

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tsclust_core::data::{store, DataError, NoProgress, QuoteProvider, RetryPolicy};
use tsclust_core::model::INPUT_CHANNELS;
use tsclust_core::{model_batch, Companies, Company, ConvAutoencoder, Field, Quote, QuoteTable};

fn daily_table(rows: usize, base: f64) -> QuoteTable {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    QuoteTable::from_rows((0..rows).map(|i| {
        let close = base + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.1;
        (
            start + chrono::Duration::days(i as i64),
            Quote {
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0 + i as f64 * 10.0,
            },
        )
    }))
    .unwrap()
}

/// Provider with a fixed row count per ticker; unknown tickers always fail.
struct ScriptedProvider {
    rows: HashMap<String, usize>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedProvider {
    fn new(rows: &[(&str, usize)]) -> Self {
        Self {
            rows: rows.iter().map(|(t, n)| (t.to_string(), *n)).collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self, ticker: &str) -> usize {
        self.calls.borrow().iter().filter(|t| *t == ticker).count()
    }
}

impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, ticker: &str) -> Result<QuoteTable, DataError> {
        self.calls.borrow_mut().push(ticker.to_string());
        match self.rows.get(ticker) {
            Some(&n) => Ok(daily_table(n, 100.0)),
            None => Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
                message: "scripted failure".into(),
            }),
        }
    }
}

fn no_sleep(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay: Duration::ZERO,
    }
}

#[test]
fn failing_ticker_is_skipped_after_retry_budget() {
    let provider = ScriptedProvider::new(&[("BBB", 120)]);

    let (companies, skipped) =
        Companies::from_tickers(&provider, &["AAA", "BBB"], &no_sleep(2), &NoProgress);

    assert_eq!(companies.tickers(), vec!["BBB"]);
    assert_eq!(skipped, vec!["AAA".to_string()]);
    // First pass plus exactly two retry rounds.
    assert_eq!(provider.call_count("AAA"), 3);
    assert_eq!(provider.call_count("BBB"), 1);
}

#[test]
fn acquired_short_histories_are_filtered() {
    let provider = ScriptedProvider::new(&[("X", 120), ("Y", 50)]);

    let (companies, skipped) =
        Companies::from_tickers(&provider, &["X", "Y"], &no_sleep(5), &NoProgress);

    assert!(skipped.is_empty());
    assert_eq!(companies.len(), 1);
    assert_eq!(companies.get(0).unwrap().ticker(), "X");
}

#[test]
fn three_row_snapshot_round_trips() {
    let table = QuoteTable::from_rows(vec![
        (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), quote(10.5)),
        (NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), quote(11.25)),
        (NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), quote(9.75)),
    ])
    .unwrap();
    let original = Company::new("ONE", table);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.json");
    store::save(&path, std::slice::from_ref(&original)).unwrap();
    let loaded = store::load(&path).unwrap();

    assert_eq!(loaded.len(), 1);
    let back = &loaded[0];
    assert_eq!(back.ticker(), "ONE");
    assert_eq!(
        back.table().dates().collect::<Vec<_>>(),
        original.table().dates().collect::<Vec<_>>()
    );
    assert_eq!(back.table().column(Field::Close), vec![10.5, 11.25, 9.75]);
}

#[test]
fn collection_snapshot_round_trips_and_refilters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companies.json");

    let companies = Companies::from_companies(vec![
        Company::new("AAPL", daily_table(130, 150.0)),
        Company::new("MSFT", daily_table(101, 300.0)),
    ]);
    companies.save_json(&path).unwrap();

    let loaded = Companies::load_json(&path).unwrap();
    assert_eq!(loaded, companies);
    assert_eq!(loaded.fingerprint(), companies.fingerprint());

    // A snapshot holding a short history loses it on load.
    store::save(
        &path,
        &[
            Company::new("AAPL", daily_table(130, 150.0)),
            Company::new("TINY", daily_table(20, 5.0)),
        ],
    )
    .unwrap();
    let reloaded = Companies::load_json(&path).unwrap();
    assert_eq!(reloaded.tickers(), vec!["AAPL"]);
}

#[test]
fn dataset_feeds_autoencoder() {
    let companies = Companies::from_companies(
        (0..INPUT_CHANNELS)
            .map(|i| Company::new(format!("T{i:02}"), daily_table(105, 50.0 + i as f64)))
            .collect(),
    );

    let dataset = companies.build_image_dataset(Field::Close, 7).unwrap();
    assert_eq!(dataset.dim(), (INPUT_CHANNELS, 15, 7));
    assert!(dataset.iter().all(|v| *v <= 1.0));

    let batch = model_batch(dataset);
    let model = ConvAutoencoder::new(42);

    let latent = model.encode(&batch).unwrap();
    assert_eq!(latent.dim(), (1, 2, 17, 9));

    let out = model.forward(&batch).unwrap();
    assert_eq!(out.dim(), batch.dim());
}

#[test]
fn comparison_table_over_loaded_collection() {
    let companies = Companies::from_companies(vec![
        Company::new("AAA", daily_table(100, 10.0)),
        Company::new("BBB", daily_table(110, 20.0)),
    ]);

    let table = companies
        .comparison_table(Some(&["BBB", "AAA"][..]), Field::Close, true)
        .unwrap();

    // Collection order, not request order.
    assert_eq!(table.tickers, vec!["AAA", "BBB"]);
    assert_eq!(table.len(), 110);

    let aaa = table.column("AAA").unwrap();
    assert!(aaa[100..].iter().all(|v| v.is_nan()));
    let peak = aaa.iter().copied().filter(|v| !v.is_nan()).fold(f64::MIN, f64::max);
    assert_eq!(peak, 1.0);
}

fn quote(close: f64) -> Quote {
    Quote {
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 500.0,
    }
}
