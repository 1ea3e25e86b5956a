//! asmspy-core
//!
//! Core library for finding conflicting assembly references across a
//! directory of .NET modules.
//!
//! This crate holds the metadata extractor, the reference index, the conflict
//! classifier and the presentation grouper. The CLI is a thin layer over
//! [`analysis::Analyzer`] so that everything here stays testable without a
//! terminal.

pub mod analysis;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod scanner;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use analysis::Analyzer;
pub use config::{AnalysisOptions, ScanConfig};
pub use error::{AnalysisError, LoadError, SpyResult};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
