//! folio-quotes
//!
//! Quote provider boundary. This crate owns the provider abstraction and the
//! concrete HTTP provider; it does **not** touch the database — callers fetch
//! quotes and decide what to do with them.

pub mod provider;

pub use provider::{FixedQuoteProvider, HttpQuoteProvider, QuoteError, QuoteProvider};
