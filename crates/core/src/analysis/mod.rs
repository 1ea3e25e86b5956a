//! Reference conflict analysis.
//!
//! Pipeline, leaf first:
//! - [`index`]: parallel extraction into a shared `ReferenceIndex`.
//! - [`classify`]: distinct versions per dependency, conflict filtering.
//! - [`grouping`]: version -> presentation group, computed per result.
//!
//! [`Analyzer`] ties them together with the directory scanner.

pub mod classify;
pub mod grouping;
pub mod index;

use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::config::{AnalysisOptions, ScanConfig};
use crate::error::SpyResult;
use crate::model::{AnalysisReport, Module};
use crate::scanner::discover_modules;

pub use classify::{classify, classify_entries};
pub use grouping::{group_indices, DEFAULT_PALETTE_SIZE};
pub use index::{aggregate, ReferenceIndex};

/// Runs a full analysis for one set of options.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    pub options: AnalysisOptions,
    pub config: ScanConfig,
}

impl Analyzer {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options, config: ScanConfig::default() }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Scan `root` and analyse every module found.
    ///
    /// Fails with `PathNotFound` / `NoModulesFound` before any extraction runs.
    pub fn analyse(&self, root: &Path) -> SpyResult<AnalysisReport> {
        let modules = discover_modules(root, self.options.recurse, &self.config)?;
        self.analyse_modules(root, &modules)
    }

    /// Analyse an explicit module list. Load failures are reported, not fatal.
    pub fn analyse_modules(&self, root: &Path, modules: &[Module]) -> SpyResult<AnalysisReport> {
        info!(root = %root.display(), modules = modules.len(), "Analysing assemblies");

        let (index, failures) = match self.options.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
                pool.install(|| aggregate(modules))
            }
            None => aggregate(modules),
        };

        let results = classify(&index, &self.options, &self.config);
        let report = AnalysisReport {
            root: root.to_path_buf(),
            generated_at: Utc::now().to_rfc3339(),
            modules_scanned: modules.len(),
            results,
            failures,
        };

        info!(
            results = report.results.len(),
            conflicts = report.conflict_count(),
            failures = report.failures.len(),
            "Analysis complete"
        );
        Ok(report)
    }
}
