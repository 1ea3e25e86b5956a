//! Reference index: dependency name -> every reference to it.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::metadata;
use crate::model::{DependencyReference, LoadFailure, Module, ModuleManifest};

/// Concurrently writable index of declared references, keyed by dependency name.
///
/// Writers take the lock once per module, so a name's list is created exactly
/// once no matter how many workers race on it. Per-name insertion order
/// depends on completion order; `snapshot` normalizes it.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    entries: Mutex<HashMap<String, Vec<DependencyReference>>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every reference a module declares, attributed to `referenced_by`.
    pub fn record_manifest(&self, referenced_by: &str, manifest: &ModuleManifest) {
        if manifest.references.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        for declared in &manifest.references {
            entries.entry(declared.name.clone()).or_default().push(DependencyReference {
                name: declared.name.clone(),
                version: declared.version,
                referenced_by: referenced_by.to_string(),
            });
        }
    }

    /// Number of distinct dependency names.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Total number of recorded references across all names.
    pub fn reference_count(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// Names in sorted order, each with its references sorted by (version, referencer).
    pub fn snapshot(&self) -> BTreeMap<String, Vec<DependencyReference>> {
        let entries = self.entries.lock();
        entries
            .iter()
            .map(|(name, refs)| {
                let mut refs = refs.clone();
                refs.sort();
                (name.clone(), refs)
            })
            .collect()
    }
}

/// Extract every module in parallel and fold the results into one index.
///
/// Modules that fail to load contribute nothing to the index and are returned
/// as `LoadFailure`s, sorted by path.
pub fn aggregate(modules: &[Module]) -> (ReferenceIndex, Vec<LoadFailure>) {
    let index = ReferenceIndex::new();

    let mut failures: Vec<LoadFailure> = modules
        .par_iter()
        .filter_map(|module| match metadata::extract(&module.path) {
            Ok(manifest) => {
                let referencer = manifest.assembly_name.as_deref().unwrap_or(&module.display_name);
                index.record_manifest(referencer, &manifest);
                None
            }
            Err(err) => {
                warn!(path = %module.path.display(), error = %err, "Failed to load assembly");
                Some(LoadFailure {
                    path: module.path.clone(),
                    display_name: module.display_name.clone(),
                    reason: err.to_string(),
                })
            }
        })
        .collect();
    failures.sort();

    debug!(
        modules = modules.len(),
        failures = failures.len(),
        dependencies = index.len(),
        "Aggregated assembly references"
    );
    (index, failures)
}
