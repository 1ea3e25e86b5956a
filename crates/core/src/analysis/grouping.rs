//! Presentation grouping: a stable small integer per distinct version.

use crate::model::{AssemblyResult, AssemblyVersion, GroupMap};

/// Number of styles the default console palette offers.
pub const DEFAULT_PALETTE_SIZE: usize = 6;

/// Map each distinct version of `result` to its position in `result.versions`,
/// wrapped into `palette_size` slots.
pub fn group_indices(result: &AssemblyResult, palette_size: usize) -> GroupMap {
    let slots = palette_size.max(1);
    result.versions.iter().enumerate().map(|(i, v)| (*v, i % slots)).collect()
}

impl AssemblyResult {
    /// Unwrapped group index of `version`, if it is referenced at all.
    pub fn group_index(&self, version: &AssemblyVersion) -> Option<usize> {
        self.versions.iter().position(|v| v == version)
    }

    /// Group map for a palette of `palette_size` styles.
    pub fn group_indices(&self, palette_size: usize) -> GroupMap {
        group_indices(self, palette_size)
    }
}
