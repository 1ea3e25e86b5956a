//! Metadata extractor: reads the declared assembly references of a managed module.
//!
//! `dotscope` parses the PE container, the CLI header and the `#~` tables.
//! Only the raw `Assembly` and `AssemblyRef` rows are decoded here; types and
//! method bodies are never resolved. Everything past this module only sees
//! `ModuleManifest` / `DeclaredReference`.

use std::fs;
use std::path::Path;

use dotscope::metadata::tables::{AssemblyRaw, AssemblyRefRaw};
use dotscope::{Blob, CilAssemblyView, File, Strings, TablesHeader, ValidationConfig};
use tracing::debug;

use crate::error::LoadError;
use crate::model::{AssemblyVersion, DeclaredReference, ModuleManifest};

/// Read `path` and extract its manifest.
pub fn extract(path: impl AsRef<Path>) -> Result<ModuleManifest, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let manifest = extract_from_bytes(&bytes)?;
    debug!(
        path = %path.display(),
        references = manifest.references.len(),
        "Extracted assembly references"
    );
    Ok(manifest)
}

/// Extract the manifest of an in-memory module image.
pub fn extract_from_bytes(bytes: &[u8]) -> Result<ModuleManifest, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::NotPe("empty file".to_string()));
    }
    let file = File::from_mem(bytes.to_vec()).map_err(|e| LoadError::NotPe(e.to_string()))?;
    match file.clr() {
        Some((rva, size)) if rva != 0 && size != 0 => {}
        _ => return Err(LoadError::NotManaged),
    }

    // Only raw rows are read below; no validation pass runs.
    let view =
        CilAssemblyView::from_dotscope_file_with_validation(file, ValidationConfig::disabled())?;
    let tables = view
        .tables()
        .ok_or_else(|| LoadError::malformed("metadata has no #~ stream"))?;
    let strings = view
        .strings()
        .ok_or_else(|| LoadError::malformed("metadata has no #Strings heap"))?;

    Ok(ModuleManifest {
        assembly_name: assembly_name(tables, strings)?,
        references: assembly_refs(tables, strings, view.blobs())?,
    })
}

/// Name of the module's own `Assembly` row, if it has one.
fn assembly_name(
    tables: &TablesHeader<'_>,
    strings: &Strings<'_>,
) -> Result<Option<String>, LoadError> {
    let Some(table) = tables.table::<AssemblyRaw>() else {
        return Ok(None);
    };
    match table.get(1)? {
        Some(row) => Ok(Some(strings.get(row.name as usize)?.to_string())),
        None => Ok(None),
    }
}

/// Decode every `AssemblyRef` row in table order.
fn assembly_refs(
    tables: &TablesHeader<'_>,
    strings: &Strings<'_>,
    blobs: Option<&Blob<'_>>,
) -> Result<Vec<DeclaredReference>, LoadError> {
    let Some(table) = tables.table::<AssemblyRefRaw>() else {
        return Ok(Vec::new());
    };

    let mut refs = Vec::new();
    for row in table.iter() {
        let row = row?;
        let name = strings.get(row.name as usize)?;
        if name.is_empty() {
            return Err(LoadError::malformed(format!(
                "assembly reference {} has an empty name",
                row.rid
            )));
        }
        let culture = strings.get(row.culture as usize)?;
        let key_or_token: &[u8] = match (blobs, row.public_key_or_token) {
            (Some(heap), index) if index != 0 => heap.get(index as usize)?,
            _ => &[],
        };

        refs.push(DeclaredReference {
            name: name.to_string(),
            version: AssemblyVersion::new(
                version_part(row.major_version)?,
                version_part(row.minor_version)?,
                version_part(row.build_number)?,
                version_part(row.revision_number)?,
            ),
            culture: (!culture.is_empty()).then(|| culture.to_string()),
            public_key_token: (!key_or_token.is_empty()).then(|| hex_lower(key_or_token)),
        });
    }
    Ok(refs)
}

fn version_part(value: u32) -> Result<u16, LoadError> {
    u16::try_from(value)
        .map_err(|_| LoadError::malformed(format!("version component {value} exceeds 65535")))
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
