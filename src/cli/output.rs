//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the graphflow CLI.

use crate::ingest::IngestReport;
use crate::workflows::{GraphSummary, WorkflowOutput, WorkflowStep};
use owo_colors::OwoColorize;

const COLUMN_WIDTH: usize = 18;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the startup banner
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n   {}\n",
                "graphflow".bright_cyan().bold(),
                version.dimmed(),
                "config-driven agent orchestration".bright_white()
            );
        } else {
            println!("\n   graphflow {}\n   config-driven agent orchestration\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header = format_row(columns);
        let rule_len = columns.len() * (COLUMN_WIDTH + 1);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(rule_len).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(rule_len));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        println!("    {}", format_row(values));
    }

    /// Print the compiled graph: special nodes, then the route table.
    pub fn graph_summary(&self, summary: &GraphSummary) {
        self.header("Workflow");
        self.kv("entry", &summary.entry_node);
        self.kv("final", &summary.final_node);
        self.kv("fallback", &summary.fallback_node);

        self.header("Routing targets");
        self.table_header(&["Node", "Keyword", "Kind"]);
        for target in &summary.routing_targets {
            self.table_row(&[&target.id, &target.keyword, target.kind.as_str()]);
        }

        self.header("Route table (match order)");
        self.table_header(&["Keyword", "Target"]);
        for entry in &summary.route_table {
            self.table_row(&[&entry.keyword, &entry.target]);
        }
    }

    /// Print one executed workflow step
    pub fn step(&self, step: &WorkflowStep) {
        let phase = format!("{:?}", step.phase).to_lowercase();
        let line = format!("{} ({} ms)", step.node_id, step.duration_ms);
        if self.colored {
            println!("    {} {}", format!("[{}]", phase).dimmed(), line.bright_white());
        } else {
            println!("    [{}] {}", phase, line);
        }
    }

    /// Print the outcome of a turn
    pub fn answer(&self, output: &WorkflowOutput) {
        let route = format!("{} ({})", output.routed_to, output.routing_status);
        if self.colored {
            println!("\n  {} {}", "→".cyan().bold(), route.dimmed());
            println!("\n{}\n", output.response.bright_white());
        } else {
            println!("\n  -> {}", route);
            println!("\n{}\n", output.response);
        }
    }

    /// Print the counts from an ingestion run
    pub fn ingest_report(&self, report: &IngestReport) {
        self.success(&format!(
            "Ingested {} chunks into '{}'",
            report.chunks, report.collection
        ));
        self.kv("documents", &report.documents.to_string());
        self.kv("skipped", &report.skipped.to_string());
        if report.documents == 0 {
            self.hint("No readable documents found; supported formats are plain text files");
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

/// Pad each cell to the column width and join with single spaces.
pub fn format_row(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("{:<width$}", v, width = COLUMN_WIDTH))
        .collect::<Vec<_>>()
        .join(" ")
}
