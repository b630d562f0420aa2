pub mod core;
pub mod crawling;
pub mod datasheet;
pub mod discovery;
pub mod enrichment;
pub mod extraction;
pub mod ingest;
pub mod llm;
pub mod pipeline;

// --- Primary core exports ---
pub use core::types;
pub use core::types::*;
pub use core::{AppState, EnrichError};
