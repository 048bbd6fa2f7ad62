//! CLI presentation: text and json formatters per command.

use crate::cli::route::{GenerateReport, ModelsReport};
use crate::error::ApiError;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

fn to_pretty_json(value: &serde_json::Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to render JSON: {}", e)))
}

pub fn format_generate_text(report: &GenerateReport) -> String {
    let mut output = String::new();
    if let Some(text) = &report.text {
        output.push_str(&format!(
            "{}\n\n{}\n",
            "Model answered with text instead of an image:".bold(),
            text.trim()
        ));
        return output;
    }

    if let Some(partial) = &report.partial {
        output.push_str(&format!("{} {}\n", "Warning:".yellow().bold(), partial));
    }
    output.push_str(&format!(
        "Generated {} image(s) with {}\n",
        report.files.len(),
        report.model
    ));
    for file in &report.files {
        output.push_str(&format!("  {}\n", file.display()));
    }
    output.trim_end().to_string()
}

pub fn format_generate_json(report: &GenerateReport) -> Result<String, ApiError> {
    let files: Vec<String> = report
        .files
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    let value = json!({
        "model": report.model,
        "files": files,
        "partial": report.partial,
        "text": report.text,
    });
    to_pretty_json(&value)
}

pub fn format_models_text(report: &ModelsReport) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Name", "Model ID", "Kind"]);
    for entry in report.registry.entries() {
        table.add_row(vec![
            entry.display_name.as_str(),
            entry.id.as_str(),
            entry.kind.slug(),
        ]);
    }

    let mut output = table.to_string();
    if let Some(warning) = &report.warning {
        output.push_str(&format!("\n{} {}", "Warning:".yellow().bold(), warning));
    }
    output
}

pub fn format_models_json(report: &ModelsReport) -> Result<String, ApiError> {
    let value = json!({
        "models": report.registry.entries(),
        "total": report.registry.len(),
        "live": report.live,
        "warning": report.warning,
    });
    to_pretty_json(&value)
}
