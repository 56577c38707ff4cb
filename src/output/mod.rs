//
//  aem-cli
//  output/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Output Module
//!
//! Output formatting for the CLI:
//!
//! - **Table format**: Human-readable tabular output for interactive terminal use
//! - **JSON format**: Machine-readable JSON output for scripting and automation
//!
//! ## Architecture
//!
//! - [`table`]: Table formatting utilities using `comfy_table`
//! - [`json`]: JSON serialization utilities using `serde_json`
//! - [`report`]: Renderers for bulk results, statistics, cache stats and the audit trail
//!
//! ## Example
//!
//! ```rust,no_run
//! use aem_cli::output::{OutputFormat, OutputWriter};
//!
//! let writer = OutputWriter::new(OutputFormat::Json);
//! writer.write_success("Cache cleared");
//! ```

pub mod json;
pub mod report;
pub mod table;

pub use json::*;
pub use report::*;
pub use table::*;

use serde::Serialize;

/// The available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table format with optional color support.
    #[default]
    Table,
    /// Pretty-printed JSON for scripting and automation.
    Json,
}

/// A unified output writer that handles multiple output formats.
///
/// Data goes to stdout; errors and warnings go to stderr regardless of
/// format. Color output is detected from the terminal and disabled when
/// output is piped.
pub struct OutputWriter {
    format: OutputFormat,
    color: bool,
}

impl OutputWriter {
    /// Creates a new output writer with the specified format.
    ///
    /// # Parameters
    ///
    /// * `format` - The [`OutputFormat`] to use for rendering output
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color: console::colors_enabled(),
        }
    }

    /// JSON writer when `json` is set, table writer otherwise.
    pub fn for_json_flag(json: bool) -> Self {
        Self::new(if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        })
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Writes a value to stdout using the configured output format.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn write<T: Serialize + TableOutput>(&self, value: &T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(value)?,
            OutputFormat::Table => value.print_table(self.color),
        }
        Ok(())
    }

    /// Writes an error message to stderr, prefixed with `error:`.
    pub fn write_error(&self, msg: &str) {
        use console::style;
        if self.color {
            eprintln!("{} {}", style("error:").red().bold(), msg);
        } else {
            eprintln!("error: {}", msg);
        }
    }

    /// Writes a warning message to stderr, prefixed with `warning:`.
    pub fn write_warning(&self, msg: &str) {
        use console::style;
        if self.color {
            eprintln!("{} {}", style("warning:").yellow().bold(), msg);
        } else {
            eprintln!("warning: {}", msg);
        }
    }

    /// Writes a success message to stdout with a check mark.
    pub fn write_success(&self, msg: &str) {
        use console::style;
        if self.color {
            println!("{} {}", style("✓").green().bold(), msg);
        } else {
            println!("✓ {}", msg);
        }
    }
}

/// Types that can be rendered for a terminal.
///
/// Types written through an [`OutputWriter`] also implement [`Serialize`]
/// for JSON output.
pub trait TableOutput {
    /// Renders the value to stdout.
    ///
    /// # Parameters
    ///
    /// * `color` - Whether color output is enabled
    fn print_table(&self, color: bool);
}

/// Prints a bold header followed by a dashed underline.
pub fn print_header(text: &str) {
    use console::style;
    println!("{}", style(text).bold());
    println!("{}", "-".repeat(text.chars().count()));
}

/// Prints a key-value pair. The key is dimmed when color is enabled.
pub fn print_field(key: &str, value: &str, color: bool) {
    use console::style;
    if color {
        println!("{}: {}", style(key).dim(), value);
    } else {
        println!("{}: {}", key, value);
    }
}
