//! Plan parser module
//!
//! Turns EXPLAIN JSON into the enriched plan tree.

pub mod core;
pub mod error;

// Re-export commonly used items
pub use core::{EnrichOptions, TreeTransformer};
pub use error::{ParseError, ParseResult};
