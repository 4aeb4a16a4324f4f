//! Command handlers

pub mod audit;
pub mod client;
pub mod lender;
pub mod loan;
pub mod payment;
pub mod report;

use anyhow::{Context, Result};
use lendbook_reports::{CsvExporter, JsonExporter, MarkdownExporter, ReportData, ReportExporter};
use std::fs;

use crate::{ExportArgs, ReportFormat};

/// Export report to specified format
fn export_report(report: &dyn ReportData, format: ReportFormat) -> String {
    match format {
        ReportFormat::Csv => CsvExporter::new().export(report),
        ReportFormat::Json => JsonExporter::new().export(report),
        ReportFormat::Markdown => MarkdownExporter::new().with_toc().export(report),
    }
}

/// Format from `--format`, or from the extension of `--output`
fn resolve_format(export: &ExportArgs) -> Option<ReportFormat> {
    export.format.or_else(|| {
        let ext = export.output.as_ref()?.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(ReportFormat::Csv),
            "json" => Some(ReportFormat::Json),
            _ => Some(ReportFormat::Markdown),
        }
    })
}

/// Write `report` when an export was requested.
///
/// Returns `false` when neither `--format` nor `--output` was given, so the
/// caller prints its own table instead.
pub fn emit(report: &dyn ReportData, export: &ExportArgs) -> Result<bool> {
    let Some(format) = resolve_format(export) else {
        return Ok(false);
    };
    let content = export_report(report, format);

    match &export.output {
        Some(path) => {
            fs::write(path, &content).context("Failed to write report file")?;
            println!("✅ Report generated: {:?}", path);
        }
        None => println!("{}", content),
    }
    Ok(true)
}

/// Truncate string for display
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Optional CLI text, empty when absent
pub fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
