use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use asmspy_core::analysis::group_indices;
use asmspy_core::model::{AnalysisReport, AssemblyResult};
use colored::{Color, Colorize};

/// Console styles for version groups, indexed by group.
pub const VERSION_PALETTE: [Color; 6] =
    [Color::Green, Color::Red, Color::Yellow, Color::Blue, Color::Cyan, Color::Magenta];

/// `Check assemblies in:` banner, printed once the scan root is known to exist.
pub fn render_header(root: &Path, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Check assemblies in:")?;
    writeln!(out, "{}", root.display())?;
    writeln!(out)?;
    Ok(())
}

/// Write the human-readable report that follows the header.
pub fn render_text(
    report: &AnalysisReport,
    include_all: bool,
    color: bool,
    out: &mut impl Write,
) -> Result<()> {
    for failure in &report.failures {
        writeln!(out, "Failed to load assembly '{}': {}", failure.path.display(), failure.reason)?;
    }

    if !include_all {
        writeln!(out, "Detailing only conflicting assembly references.")?;
    }

    for result in &report.results {
        render_result(result, color, out)?;
    }
    Ok(())
}

/// `Reference: <name>` followed by one `   <version> by <referencer>` line per reference.
pub fn render_result(result: &AssemblyResult, color: bool, out: &mut impl Write) -> Result<()> {
    let groups = group_indices(result, VERSION_PALETTE.len());

    writeln!(out, "Reference: {}", result.assembly_name)?;
    for reference in &result.references {
        let version = reference.version.to_string();
        let version = match groups.get(&reference.version) {
            Some(group) if color => version.color(VERSION_PALETTE[*group]).to_string(),
            _ => version,
        };
        writeln!(out, "   {} by {}", version, reference.referenced_by)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Write the report as pretty JSON.
pub fn render_json(report: &AnalysisReport, out: &mut impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;
    writeln!(out, "{json}")?;
    Ok(())
}
