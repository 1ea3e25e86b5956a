//! Core data model for scanned modules, declared references, and reports.
//!
//! These types are shared by every stage of the pipeline:
//! - `Module` is produced by the directory scanner.
//! - `DeclaredReference` / `ModuleManifest` are produced by the metadata extractor.
//! - `DependencyReference` lives in the reference index.
//! - `AssemblyResult` / `LoadFailure` are what callers finally receive.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A candidate binary module discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Module {
    pub path: PathBuf,
    pub display_name: String,
}

impl Module {
    /// Build a module from a path, using the file stem as the display name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = display_name_for(&path);
        Self { path, display_name }
    }
}

fn display_name_for(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Four-part assembly version (`major.minor.build.revision`).
///
/// Ordering is lexicographic over the components, which matches how the
/// runtime compares versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl AssemblyVersion {
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self { major, minor, build, revision }
    }
}

impl From<(u16, u16)> for AssemblyVersion {
    fn from((major, minor): (u16, u16)) -> Self {
        Self::new(major, minor, 0, 0)
    }
}

impl From<(u16, u16, u16, u16)> for AssemblyVersion {
    fn from((major, minor, build, revision): (u16, u16, u16, u16)) -> Self {
        Self::new(major, minor, build, revision)
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid assembly version: {0:?}")]
pub struct ParseVersionError(pub String);

impl std::str::FromStr for AssemblyVersion {
    type Err = ParseVersionError;

    /// Accepts two to four dot-separated components; missing ones are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(ParseVersionError(s.to_string()));
        }
        let mut nums = [0u16; 4];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| ParseVersionError(s.to_string()))?;
        }
        Ok(Self::new(nums[0], nums[1], nums[2], nums[3]))
    }
}

impl Serialize for AssemblyVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssemblyVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One `AssemblyRef` row as declared by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredReference {
    pub name: String,
    pub version: AssemblyVersion,
    pub culture: Option<String>,
    pub public_key_token: Option<String>,
}

impl DeclaredReference {
    pub fn new(name: impl Into<String>, version: AssemblyVersion) -> Self {
        Self { name: name.into(), version, culture: None, public_key_token: None }
    }
}

/// Everything the extractor reads from a single module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleManifest {
    /// Name from the module's own `Assembly` row, if it has one.
    pub assembly_name: Option<String>,
    /// Declared references in metadata order, duplicates preserved.
    pub references: Vec<DeclaredReference>,
}

/// A reference edge stored in the index under `name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyReference {
    pub name: String,
    pub version: AssemblyVersion,
    pub referenced_by: String,
}

/// A `(version, referencer)` pair as printed in a report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub version: AssemblyVersion,
    pub referenced_by: String,
}

/// Per-dependency report produced by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub assembly_name: String,
    /// Distinct versions, in first-seen order of `references`.
    pub versions: Vec<AssemblyVersion>,
    pub references: Vec<ReferenceEntry>,
}

impl AssemblyResult {
    /// True when more than one distinct version is referenced.
    pub fn is_conflict(&self) -> bool {
        self.versions.len() > 1
    }
}

/// A module that could not be read as a managed assembly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub display_name: String,
    pub reason: String,
}

/// Final output of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub root: PathBuf,
    pub generated_at: String,
    pub modules_scanned: usize,
    pub results: Vec<AssemblyResult>,
    pub failures: Vec<LoadFailure>,
}

impl AnalysisReport {
    pub fn conflict_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_conflict()).count()
    }

    /// Look up a result by dependency name.
    pub fn result(&self, name: &str) -> Option<&AssemblyResult> {
        self.results.iter().find(|r| r.assembly_name == name)
    }
}

/// Version -> presentation group mapping for one result.
pub type GroupMap = BTreeMap<AssemblyVersion, usize>;
