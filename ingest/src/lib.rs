//! # Ingest
//!
//! Consumes stable-file notifications from the settle watcher and converts
//! each new raw file exactly once:
//!
//! ```text
//! StableFile ──► ExtensionFilter ──► IndexStore (seen?)
//!                                        │
//!                                        ▼
//!                 IndexStore (record) ◄── Converter
//! ```

pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod filter;
pub mod index;
pub mod pipeline;
pub mod service;

pub use config::{ConverterConfig, IngestConfig};
pub use converter::{ConversionReport, Converter};
pub use error::{IngestError, Result};
pub use filter::ExtensionFilter;
pub use index::{IndexEntry, IndexStore};
pub use pipeline::{IngestOutcome, IngestStats, Ingestor};
