//! Table renderings of the run reports printed on stdout.

use comfy_table::{Cell, ContentArrangement, Table};
use core_types::Statement;
use engine::{ApplyReport, TeardownReport};

const PREVIEW_CHARS: usize = 80;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

/// Outcome counts, unexpected failures, tables, row counts and probes.
pub fn format_apply(report: &ApplyReport) -> String {
    let mut sections = Vec::new();

    let mut counts = new_table();
    counts.set_header(vec!["Script", "Succeeded", "Expected failures", "Unexpected failures"]);
    counts.add_row(vec![
        Cell::new(report.script.display()),
        Cell::new(report.counts.succeeded),
        Cell::new(report.counts.expected_failures),
        Cell::new(report.counts.unexpected_failures),
    ]);
    sections.push(counts.to_string());

    let failures: Vec<_> = report.unexpected_failures().collect();
    if !failures.is_empty() {
        let mut table = new_table();
        table.set_header(vec!["#", "Line", "Kind", "Code", "Error", "Statement"]);
        for outcome in failures {
            let (kind, code, message) = match &outcome.error {
                Some(e) => (
                    e.kind.to_string(),
                    e.code.clone().unwrap_or_else(|| "-".to_string()),
                    e.message.clone(),
                ),
                None => ("-".to_string(), "-".to_string(), String::new()),
            };
            table.add_row(vec![
                Cell::new(outcome.index),
                Cell::new(outcome.line),
                Cell::new(kind),
                Cell::new(code),
                Cell::new(message),
                Cell::new(core_types::preview(&outcome.statement, PREVIEW_CHARS)),
            ]);
        }
        sections.push(table.to_string());
    }

    let verification = &report.verification;
    let mut tables = new_table();
    tables.set_header(vec!["Table", "Rows"]);
    for name in &verification.table_names {
        let rows = match verification.row_counts.get(name) {
            Some(Some(n)) => n.to_string(),
            Some(None) => "unavailable".to_string(),
            None => String::new(),
        };
        tables.add_row(vec![Cell::new(name), Cell::new(rows)]);
    }
    for (name, count) in &verification.row_counts {
        if !verification.table_names.contains(name) {
            let rows = count.map_or_else(|| "unavailable".to_string(), |n| n.to_string());
            tables.add_row(vec![Cell::new(format!("{name} (missing)")), Cell::new(rows)]);
        }
    }
    sections.push(tables.to_string());

    if !verification.probe_results.is_empty() {
        let mut probes = new_table();
        probes.set_header(vec!["Probe", "Status"]);
        for (name, status) in &verification.probe_results {
            probes.add_row(vec![Cell::new(name), Cell::new(status)]);
        }
        sections.push(probes.to_string());
    }

    sections.join("\n")
}

pub fn format_teardown(report: &TeardownReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["#", "Object", "Status"]);
    for (i, step) in report.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.target),
            Cell::new(step.status),
        ]);
    }
    table.to_string()
}

/// Numbered statement previews for `plan`.
pub fn format_plan(statements: &[Statement]) -> String {
    let mut table = new_table();
    table.set_header(vec!["#", "Line", "Statement"]);
    for statement in statements {
        table.add_row(vec![
            Cell::new(statement.index),
            Cell::new(statement.line),
            Cell::new(statement.preview(PREVIEW_CHARS)),
        ]);
    }
    table.to_string()
}
