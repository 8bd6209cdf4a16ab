//! Terminal rendering of findings.

use crate::taint::findings::Finding;
use crate::taint::rules::Severity;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};

/// Prints findings as a table, or one line per finding in quiet mode.
pub fn print_findings(findings: &[Finding], quiet: bool) {
    if findings.is_empty() {
        println!("{}", "No taint flows found.".green());
        return;
    }

    if quiet {
        for finding in findings {
            let loc = finding.sink_loc();
            println!(
                "{} {} {}:{} {} -> {}",
                finding.severity,
                finding.sink_rule_name,
                crate::utils::normalize_display_path(&loc.file),
                loc.start_line,
                finding.source_tag,
                finding.checker_id
            );
        }
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Severity", "Rule", "Checker", "Sink", "Source", "Depth"]);
    for finding in findings {
        let loc = finding.sink_loc();
        table.add_row(vec![
            severity_cell(finding.severity),
            Cell::new(&finding.sink_rule_name),
            Cell::new(&finding.checker_id),
            Cell::new(format!(
                "{}:{}",
                crate::utils::normalize_display_path(&loc.file),
                loc.start_line
            )),
            Cell::new(&finding.source_tag),
            Cell::new(finding.callstack.len().to_string()),
        ]);
    }
    println!("{table}");
    println!(
        "{}",
        format!("{} taint flow(s) found.", findings.len()).red().bold()
    );
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity.to_string());
    match severity {
        Severity::Critical | Severity::High => cell.fg(Color::Red),
        Severity::Medium => cell.fg(Color::Yellow),
        Severity::Low => cell.fg(Color::Blue),
    }
}
