//! Core parsing components for PostgreSQL plan analysis

pub mod document_parser;
pub mod edge_labeler;
pub mod node_enricher;
pub mod tree_transformer;

pub use document_parser::DocumentParser;
pub use edge_labeler::EdgeLabeler;
pub use node_enricher::{EnrichOptions, NodeEnricher};
pub use tree_transformer::TreeTransformer;
