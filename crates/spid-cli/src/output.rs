//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON.
    Json,
}

/// Prints a success message.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Outputs a single item.
///
/// # Errors
///
/// Returns an error if the item cannot be serialized.
pub fn output_single<T: Serialize>(item: &T, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Text => {
            let value = serde_json::to_value(item)?;
            print!("{}", render_text(&value, 0));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Renders a JSON value as indented `key: value` lines.
#[must_use]
pub fn render_text(value: &serde_json::Value, indent: usize) -> String {
    let prefix = "  ".repeat(indent);
    let mut out = String::new();

    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                if item.is_object() || item.is_array() {
                    out.push_str(&format!("{prefix}-\n"));
                    out.push_str(&render_text(item, indent + 1));
                } else {
                    out.push_str(&format!("{prefix}- {}\n", scalar(item)));
                }
            }
        }
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                if val.is_object() || val.is_array() {
                    out.push_str(&format!("{prefix}{key}:\n"));
                    out.push_str(&render_text(val, indent + 1));
                } else {
                    out.push_str(&format!("{prefix}{key}: {}\n", scalar(val)));
                }
            }
        }
        scalar_value => out.push_str(&format!("{prefix}{}\n", scalar(scalar_value))),
    }
    out
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
