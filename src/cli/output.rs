// Output formatting and display for CLI

use crate::logs::{Level, LogRecord, StoreStats};
use crate::query::QueryOutcome;
use colored::*;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print the answer to a query
pub fn print_outcome(outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Records { records, .. } => {
            let rendered = outcome.render();
            if let Some(header) = rendered.lines().next() {
                println!("{}", header.bold());
            }
            println!();
            for record in records {
                println!("{}", format_record_colored(record));
            }
        }
        QueryOutcome::Empty { guidance, .. } => {
            println!("{}", guidance.yellow());
        }
        QueryOutcome::Failed { .. } => {
            print_error(&outcome.render());
        }
    }
}

/// Print a formatted table of the store files
pub fn print_status_table(stats: &[StoreStats]) {
    #[derive(Tabled)]
    struct StoreRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "File")]
        file: String,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Lines")]
        lines: String,
    }

    let rows: Vec<StoreRow> = stats
        .iter()
        .map(|s| StoreRow {
            source: s.source.to_string(),
            file: s.path.display().to_string(),
            size: if s.exists {
                format_size(s.size)
            } else {
                "-".to_string()
            },
            lines: if s.exists {
                s.lines.to_string()
            } else {
                "-".to_string()
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
}

/// Color a record line by its level
fn format_record_colored(record: &LogRecord) -> String {
    let line = record.format();
    match record.effective_level() {
        Level::Error => line.red().to_string(),
        Level::Warn => line.yellow().to_string(),
        Level::Info => line.cyan().to_string(),
        Level::Debug => line.bright_black().to_string(),
        Level::Log => line,
    }
}

/// Format a file size in human-readable format
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{Arg, Source};

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00GB");
    }

    #[test]
    fn test_format_record_keeps_text() {
        colored::control::set_override(false);
        let record = LogRecord::console(Source::Server, Level::Warn, &[Arg::text("slow query")]);
        assert_eq!(format_record_colored(&record), record.format());
    }
}
