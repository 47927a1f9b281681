//! Data acquisition and persistence.

pub mod acquire;
pub mod alpha_vantage;
pub mod provider;
pub mod store;

pub use acquire::{acquire, Acquisition, RetryPolicy};
pub use alpha_vantage::AlphaVantageProvider;
pub use provider::{AcquisitionProgress, DataError, LogProgress, NoProgress, QuoteProvider};
