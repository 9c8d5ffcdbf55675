pub mod client;
pub mod models;

pub use client::{QuoteClient, QuoteError};
pub use models::{Quote, QuoteBody};
