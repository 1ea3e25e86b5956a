use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asmspy_core::model::AnalysisReport;
use asmspy_core::{AnalysisOptions, Analyzer, ScanConfig};
use tracing::debug;

use crate::commands::{render_header, render_json, render_text};
use crate::resolve_scan_root;

/// Everything one `asmspy` invocation asks for.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub path: String,
    pub options: AnalysisOptions,
    pub config_path: Option<PathBuf>,
    pub json: bool,
    pub color: bool,
}

/// Load the scan config named by the request, or the defaults.
pub fn load_scan_config(request: &AnalyzeRequest) -> Result<ScanConfig> {
    match &request.config_path {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ScanConfig::default()),
    }
}

/// Run the analysis without rendering anything.
pub fn run_analysis(request: &AnalyzeRequest) -> Result<AnalysisReport> {
    run_analysis_with(request, |_| Ok(()))
}

/// Run the analysis, calling `on_root` with the scan root once it is known to
/// be a directory and before any module is discovered.
pub fn run_analysis_with(
    request: &AnalyzeRequest,
    mut on_root: impl FnMut(&Path) -> Result<()>,
) -> Result<AnalysisReport> {
    let config = load_scan_config(request)?;
    let root = resolve_scan_root(&request.path)?;
    debug!(root = %root.display(), options = ?request.options, "Resolved scan root");
    if root.is_dir() {
        on_root(&root)?;
    }
    let analyzer = Analyzer::new(request.options.clone()).with_config(config);
    let report = analyzer.analyse(&root)?;
    Ok(report)
}

/// Analyse and print the report to stdout as text or JSON.
pub fn analyze_command(request: &AnalyzeRequest) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Printed before discovery, so a "No dll files" failure still shows it.
    let report = run_analysis_with(request, |root| {
        if request.json {
            return Ok(());
        }
        render_header(root, &mut out)?;
        out.flush().context("Failed to flush stdout")
    })?;

    if request.json {
        render_json(&report, &mut out)?;
    } else {
        render_text(&report, request.options.include_all, request.color, &mut out)?;
    }
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}
