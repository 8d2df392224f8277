//! @ai:module:intent Format run summaries and annotation tables for the terminal (JSON, text)
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_run_summary, format_snapshot, to_json
//! @ai:module:depends_on engine, table, annotation
//! @ai:module:stateless true

use crate::annotation::Annotation;
use crate::engine::RunSummary;
use crate::table::TableSnapshot;
use colored::Colorize;
use serde::Serialize;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

/// @ai:intent Format a run summary as a string
/// @ai:effects pure
pub fn format_run_summary(summary: &RunSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(summary, false),
        OutputFormat::JsonPretty => to_json(summary, true),
        OutputFormat::Text => format_run_summary_text(summary),
    }
}

/// @ai:intent Format a run summary as human-readable text
/// @ai:effects pure
fn format_run_summary_text(summary: &RunSummary) -> String {
    let mut output = String::new();

    for file in &summary.files {
        output.push_str(&format!(
            "{} -> {}\n",
            file.input.display().to_string().bold(),
            file.output.display().to_string().dimmed()
        ));
        output.push_str(&format!(
            "  {} annotations, {} guards, {} extensions\n",
            file.stats.annotations_recorded,
            file.stats.guards_emitted,
            file.stats.extensions_registered
        ));
        if file.stats.annotations_dropped > 0 {
            output.push_str(&format!(
                "  {} {} annotations dropped, table full\n",
                "WARN".yellow().bold(),
                file.stats.annotations_dropped
            ));
        }
        if file.stats.unclosed_guard {
            output.push_str(&format!(
                "  {} guard closed at end of file\n",
                "WARN".yellow().bold()
            ));
        }
    }

    output.push('\n');
    output.push_str(&format_annotations_text(&summary.annotations));
    output.push_str(&format!(
        "{} {} files, {} extensions, {} annotations\n",
        "OK".green().bold(),
        summary.files.len(),
        summary.extensions_loaded,
        summary.annotations.len()
    ));

    output
}

/// @ai:intent Format an annotation table snapshot
/// @ai:effects pure
pub fn format_snapshot(snapshot: &TableSnapshot, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(snapshot, false),
        OutputFormat::JsonPretty => to_json(snapshot, true),
        OutputFormat::Text => format_annotations_text(&snapshot.annotations),
    }
}

fn format_annotations_text(annotations: &[Annotation]) -> String {
    let mut output = format!("Annotations ({}):\n", annotations.len());

    for annotation in annotations {
        let condition = match (&annotation.condition, annotation.is_removed) {
            (Some(c), true) => format!("[{}]", c).red().to_string(),
            (Some(c), false) => format!("[{}]", c).yellow().to_string(),
            (None, _) => String::new(),
        };
        output.push_str(&format!(
            "  @{} {} {} {}\n",
            annotation.name.cyan(),
            annotation.target_name,
            condition,
            format!(
                "{}:{}",
                annotation.location.file.display(),
                annotation.location.line
            )
            .dimmed()
        ));
        if let Some(description) = annotation.description() {
            output.push_str(&format!("      {}\n", description));
        }
    }

    output
}

/// @ai:intent Format any serializable value as JSON
/// @ai:effects pure
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}
