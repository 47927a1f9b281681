//! Domain types: quotes, quote tables and companies.

pub mod company;
pub mod quote;
pub mod table;

pub use company::Company;
pub use quote::{Field, Quote};
pub use table::QuoteTable;
