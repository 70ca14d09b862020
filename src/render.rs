//! Terminal rendering of run progress and reports.

use colored::Colorize;

use reconcile::{NodeRecord, NodeStatus, Observer, RunReport, RunStatus};

/// Prints one line per node as execution proceeds.
pub struct ConsoleObserver {
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Observer for ConsoleObserver {
    fn on_node_start(&mut self, _id: &str, _summary: &str) {}

    fn on_node_complete(&mut self, record: &NodeRecord) {
        if self.quiet {
            return;
        }
        println!("{}", format_record(record));
    }
}

fn format_record(record: &NodeRecord) -> String {
    let symbol = match record.status {
        NodeStatus::Changed => "~".yellow(),
        NodeStatus::Unchanged => "✓".green(),
        NodeStatus::Skipped => "-".dimmed(),
        NodeStatus::Failed => "✗".red(),
    };
    let mut line = format!("  {symbol} {} ({})", record.node_id, record.status);
    if let Some(message) = &record.message {
        line.push_str(&format!(": {message}"));
    }
    line
}

/// Print the closing summary for a text-format run.
pub fn print_summary(report: &RunReport) {
    let summary = report.summary();
    println!();
    if report.cancelled {
        println!("  {} run cancelled", "!".yellow().bold());
    }
    match report.status() {
        RunStatus::Succeeded => println!("  {} {summary}", "✓".green().bold()),
        RunStatus::Failed => {
            println!("  {} {summary}", "✗".red().bold());
            for failure in report.failures() {
                println!(
                    "    {} {}: {}",
                    "✗".red(),
                    failure.node_id,
                    failure.message.as_deref().unwrap_or("unknown failure")
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record_includes_message() {
        let record = NodeRecord::new(
            "main[0]",
            NodeStatus::Failed,
            Some("client error: boom".into()),
        );
        let line = format_record(&record);
        assert!(line.contains("main[0]"));
        assert!(line.contains("failed"));
        assert!(line.contains("client error: boom"));
    }
}
