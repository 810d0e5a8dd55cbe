//! HTML report generation.
//!
//! Renders a `RunResult` as a standalone HTML page. Phase results have no
//! fixed schema, so they are rendered generically as nested tables.

use super::persist::{load_results, write_atomic};
use crate::error::PersistError;
use crate::models::{PhaseResult, ResultValue, RunResult, Summary};
use std::path::{Path, PathBuf};
use tracing::info;

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#1d2b36}\
table{border-collapse:collapse;margin:0.5em 0}\
th,td{border:1px solid #c8d3dc;padding:4px 8px;text-align:left;vertical-align:top}\
th{background:#eef3f7}\
.cards{display:flex;gap:1em}\
.card{border:1px solid #c8d3dc;border-radius:6px;padding:0.8em 1.2em}\
.card .value{font-size:1.6em;font-weight:bold}\
.error{background:#fdecea;border:1px solid #f5c2c0;padding:0.6em;border-radius:4px}\
.empty{color:#6b7c8a;font-style:italic}";

/// Generate a complete HTML report.
pub fn generate_html_report(results: &RunResult) -> String {
    let mut output = String::new();

    output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    output.push_str("<title>Water Monitoring Test Report</title>\n");
    output.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
    output.push_str("<h1>🌊 Water Monitoring Test Report</h1>\n");

    output.push_str(&generate_summary_section(&results.summary));
    output.push_str(&generate_phase_section("Metadata", &results.metadata));
    output.push_str(&generate_phase_section("Accuracy Tests", &results.accuracy_tests));
    output.push_str(&generate_phase_section(
        "Performance Tests",
        &results.performance_tests,
    ));
    output.push_str(&generate_phase_section(
        "Night Vision Tests",
        &results.night_vision_tests,
    ));

    output.push_str("<hr>\n<p class=\"empty\">Generated by wmbench</p>\n</body>\n</html>\n");
    output
}

/// Generate the summary cards.
fn generate_summary_section(summary: &Summary) -> String {
    let mut section = String::new();

    section.push_str("<h2>Summary</h2>\n<div class=\"cards\">\n");
    let cards = [
        ("Tests Run", summary.total_tests_run.to_string()),
        ("Passed", summary.tests_passed.to_string()),
        ("Failed", summary.tests_failed.to_string()),
        ("Overall Score", format!("{:.2}%", summary.overall_score * 100.0)),
    ];
    for (label, value) in cards {
        section.push_str(&format!(
            "<div class=\"card\"><div>{}</div><div class=\"value\">{}</div></div>\n",
            label, value
        ));
    }
    section.push_str("</div>\n");

    section
}

/// Generate the section for one phase.
fn generate_phase_section(title: &str, result: &PhaseResult) -> String {
    let mut section = String::new();

    section.push_str(&format!("<h2>{}</h2>\n", escape_html(title)));

    if let Some(ResultValue::String(message)) = result.get("error") {
        section.push_str(&format!(
            "<div class=\"error\">⚠ {}</div>\n",
            escape_html(message)
        ));
    }

    if result.is_empty() {
        section.push_str("<p class=\"empty\">No results recorded.</p>\n");
    } else {
        section.push_str(&render_mapping(result));
        section.push('\n');
    }

    section
}

fn render_mapping(map: &PhaseResult) -> String {
    if map.is_empty() {
        return "<span class=\"empty\">(none)</span>".to_string();
    }

    let mut table = String::from("<table>");
    for (key, value) in map {
        table.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(key),
            render_value(value)
        ));
    }
    table.push_str("</table>");
    table
}

fn render_value(value: &ResultValue) -> String {
    match value {
        ResultValue::Null => "<span class=\"empty\">n/a</span>".to_string(),
        ResultValue::Bool(b) => (if *b { "yes" } else { "no" }).to_string(),
        ResultValue::Integer(i) => i.to_string(),
        ResultValue::Float(f) => format!("{:.4}", f),
        ResultValue::String(s) => escape_html(s),
        ResultValue::Path(p) => format!("<code>{}</code>", escape_html(&p.to_string_lossy())),
        ResultValue::Sequence(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        ResultValue::Mapping(map) => render_mapping(map),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Write the HTML report for `results` to `path`.
pub fn write_html_report(results: &RunResult, path: &Path) -> Result<PathBuf, PersistError> {
    let content = generate_html_report(results);
    write_atomic(path, content.as_bytes())?;
    info!("📊 Report written to: {}", path.display());
    Ok(path.to_path_buf())
}

/// Regenerate a report from a persisted results document.
pub fn generate_from_results(results_file: &Path, output: &Path) -> Result<PathBuf, PersistError> {
    let results = load_results(results_file)?;
    write_html_report(&results, output)
}
