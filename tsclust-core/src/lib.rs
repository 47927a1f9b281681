//! tsclust core: daily quotes, company collections and image windows.
//!
//! This crate contains:
//! - Domain types (quotes, date-indexed quote tables, companies)
//! - The Alpha Vantage fetcher behind the `QuoteProvider` trait
//! - Bulk acquisition with a bounded retry loop
//! - JSON snapshots of a collection
//! - Wide comparison tables and stacked windowed-image datasets
//! - A fixed convolutional autoencoder over those datasets

pub mod collection;
pub mod comparison;
pub mod config;
pub mod data;
pub mod domain;
pub mod model;
pub mod window;

pub use collection::{model_batch, Companies, DEFAULT_WINDOW, MIN_OBSERVATIONS};
pub use comparison::ComparisonTable;
pub use config::{Config, ConfigError};
pub use data::DataError;
pub use domain::{Company, Field, Quote, QuoteTable};
pub use model::{ConvAutoencoder, ModelError};
