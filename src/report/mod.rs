//! HTML report assembly
//!
//! Reports are self-contained documents: every chart is embedded as a
//! `data:` URI so the file can be moved or converted without its images.

use crate::analysis::SummaryRecord;
use crate::training::{MetricsRecord, ModelType};
use crate::visualization::Visualizations;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const STYLE: &str = r#"<style>
body { font-family: sans-serif; margin: 2em; background: #f5f5f5; color: #333; }
.card { background: white; border-radius: 8px; padding: 1.5em; margin: 1em 0; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
h1 { color: #333; } h2 { color: #555; margin-top: 0; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(240px, 1fr)); gap: 1em; }
.metric { font-size: 1.6em; font-weight: bold; color: #2563eb; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #ddd; padding: 0.35em 0.6em; text-align: left; }
.note { color: #777; font-style: italic; }
img { max-width: 100%; }
</style>"#;

/// What a prediction report describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_type: ModelType,
    pub target_column: String,
    pub training_date: DateTime<Utc>,
}

/// Escape text for interpolation into HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{:.4}", v)
    }
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n{}\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

fn images_section(out: &mut String, heading: &str, images: &Visualizations) {
    if images.is_empty() {
        return;
    }
    let _ = writeln!(out, "<h2>{}</h2>", escape_html(heading));
    for image in images.iter() {
        let _ = writeln!(
            out,
            "<div class=\"card\"><h3>{}</h3><img alt=\"{}\" src=\"{}\"></div>",
            escape_html(&image.name.replace('_', " ")),
            escape_html(&image.name),
            image.data_uri()
        );
    }
}

/// Render the analysis report for a summary and its charts.
///
/// At most `max_cards` statistics cards are rendered; the rest are noted as
/// omitted.
pub fn render_analysis_report(
    summary: &SummaryRecord,
    images: &Visualizations,
    generated_at: DateTime<Utc>,
    max_cards: usize,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>Data Analysis Report</h1>");
    let _ = writeln!(
        body,
        "<p class=\"note\">Generated {}</p>",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(body, "<div class=\"grid\">");
    let _ = writeln!(
        body,
        "  <div class=\"card\"><h2>Rows</h2><div class=\"metric\">{}</div></div>",
        summary.shape.0
    );
    let _ = writeln!(
        body,
        "  <div class=\"card\"><h2>Columns</h2><div class=\"metric\">{}</div></div>",
        summary.shape.1
    );
    let _ = writeln!(
        body,
        "  <div class=\"card\"><h2>Missing Values</h2><div class=\"metric\">{}</div></div>",
        summary.total_missing()
    );
    let _ = writeln!(body, "</div>");

    let _ = writeln!(body, "<h2>Summary Statistics</h2>\n<div class=\"grid\">");
    for (column, stats) in summary.describe.iter().take(max_cards) {
        let _ = writeln!(body, "  <div class=\"card\"><h2>{}</h2><table>", escape_html(column));
        for (label, value) in stats.rows() {
            let _ = writeln!(body, "    <tr><th>{}</th><td>{}</td></tr>", label, format_value(value));
        }
        let _ = writeln!(body, "  </table></div>");
    }
    let _ = writeln!(body, "</div>");
    let omitted = summary.describe.len().saturating_sub(max_cards);
    if omitted > 0 {
        let _ = writeln!(
            body,
            "<p class=\"note\">{} more column(s) omitted from the summary statistics.</p>",
            omitted
        );
    }

    let _ = writeln!(body, "<h2>Column Types and Missing Values</h2>\n<div class=\"card\"><table>");
    let _ = writeln!(body, "  <tr><th>Column</th><th>Type</th><th>Missing</th></tr>");
    for column in &summary.columns {
        let dtype = summary.dtypes.get(column).map(String::as_str).unwrap_or("");
        let missing = summary.missing_values.get(column).copied().unwrap_or(0);
        let _ = writeln!(
            body,
            "  <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(column),
            escape_html(dtype),
            missing
        );
    }
    let _ = writeln!(body, "</table></div>");

    images_section(&mut body, "Visualizations", images);
    document("Data Analysis Report", &body)
}

/// Render the prediction report for a trained model
pub fn render_prediction_report(
    model: &ModelDescriptor,
    metrics: &MetricsRecord,
    images: &Visualizations,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>Prediction Model Report</h1>");
    let _ = writeln!(body, "<div class=\"card\"><h2>Model Information</h2><table>");
    let _ = writeln!(
        body,
        "  <tr><th>Model Type</th><td>{}</td></tr>",
        escape_html(model.model_type.display_name())
    );
    let _ = writeln!(
        body,
        "  <tr><th>Target Column</th><td>{}</td></tr>",
        escape_html(&model.target_column)
    );
    let _ = writeln!(
        body,
        "  <tr><th>Training Date</th><td>{}</td></tr>",
        model.training_date.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(body, "</table></div>");

    let _ = writeln!(body, "<div class=\"card\"><h2>Model Performance</h2><table>");
    for (label, value) in metrics.rows() {
        let _ = writeln!(body, "  <tr><th>{}</th><td>{:.4}</td></tr>", label, value);
    }
    let _ = writeln!(body, "</table></div>");

    images_section(&mut body, "Model Visualizations", images);
    document("Prediction Model Report", &body)
}
