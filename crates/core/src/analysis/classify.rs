//! Conflict classifier.

use std::collections::BTreeMap;

use crate::analysis::index::ReferenceIndex;
use crate::config::{AnalysisOptions, ScanConfig};
use crate::model::{AssemblyResult, AssemblyVersion, DependencyReference, ReferenceEntry};

/// Turn the index into per-dependency results, sorted by dependency name.
///
/// Dependencies referenced at a single version are dropped unless
/// `include_all` is set; names with a system prefix are dropped when
/// `skip_system` is set.
pub fn classify(
    index: &ReferenceIndex,
    options: &AnalysisOptions,
    config: &ScanConfig,
) -> Vec<AssemblyResult> {
    classify_entries(&index.snapshot(), options, config)
}

/// Same as [`classify`] over an already normalized snapshot.
pub fn classify_entries(
    entries: &BTreeMap<String, Vec<DependencyReference>>,
    options: &AnalysisOptions,
    config: &ScanConfig,
) -> Vec<AssemblyResult> {
    entries
        .iter()
        .filter(|(name, _)| !(options.skip_system && config.is_system_name(name)))
        .filter_map(|(name, refs)| {
            let versions = distinct_versions(refs);
            if !options.include_all && versions.len() == 1 {
                return None;
            }
            Some(AssemblyResult {
                assembly_name: name.clone(),
                versions,
                references: refs
                    .iter()
                    .map(|r| ReferenceEntry { version: r.version, referenced_by: r.referenced_by.clone() })
                    .collect(),
            })
        })
        .collect()
}

/// Distinct versions in first-seen order.
fn distinct_versions(refs: &[DependencyReference]) -> Vec<AssemblyVersion> {
    let mut versions: Vec<AssemblyVersion> = Vec::new();
    for r in refs {
        if !versions.contains(&r.version) {
            versions.push(r.version);
        }
    }
    versions
}
