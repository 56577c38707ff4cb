//
//  aem-cli
//  output/table.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Table Output Formatting
//!
//! Utilities for rendering tabular output in the terminal with `comfy_table`.
//!
//! ## Example
//!
//! ```rust
//! use aem_cli::output::TableBuilder;
//!
//! let table = TableBuilder::new()
//!     .color(false)
//!     .headers(["#", "Path", "Outcome"])
//!     .row(["0", "/content/dam/a.png", "ok"])
//!     .row(["1", "/content/dam/b.png", "failed"])
//!     .build();
//! assert!(table.to_string().contains("/content/dam/b.png"));
//! ```

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

/// Creates a new table with UTF-8 borders and dynamic column widths.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// A builder for constructing formatted tables with a fluent API.
///
/// Color support is detected from the terminal on creation; use
/// [`color`](TableBuilder::color) to override it.
pub struct TableBuilder {
    table: Table,
    headers: Vec<String>,
    color: bool,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            table: create_table(),
            headers: Vec::new(),
            color: console::colors_enabled(),
        }
    }

    /// Sets whether color output is enabled.
    ///
    /// # Parameters
    ///
    /// * `enabled` - `true` to enable colors, `false` to disable
    pub fn color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    /// Sets the table headers. Headers are cyan when color is enabled.
    ///
    /// # Parameters
    ///
    /// * `headers` - An iterator of items that can be converted to `String`
    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(|s| s.into()).collect();
        if self.color {
            let header_cells: Vec<Cell> = self
                .headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect();
            self.table.set_header(header_cells);
        } else {
            self.table.set_header(&self.headers);
        }
        self
    }

    /// Adds a single row to the table.
    ///
    /// The number of cells should match the number of headers.
    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = cells.into_iter().map(|s| s.into()).collect();
        self.table.add_row(row);
        self
    }

    /// Adds multiple rows to the table at once.
    pub fn rows<I, R, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for row in rows {
            let row: Vec<String> = row.into_iter().map(|s| s.into()).collect();
            self.table.add_row(row);
        }
        self
    }

    /// Prints the table to stdout.
    pub fn print(self) {
        println!("{}", self.table);
    }

    /// Returns the underlying table.
    pub fn build(self) -> Table {
        self.table
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats an outcome or job status with semantic colors.
///
/// - **Green**: ok, success, succeeded, completed, done
/// - **Red**: failed, error, panicked
/// - **Yellow**: timed out, cancelled, running, pending, queued
///
/// Matching is case-insensitive. Unknown values are returned unstyled.
///
/// ```rust
/// use aem_cli::output::format_status;
///
/// assert_eq!(format_status("ok", false), "ok");
/// ```
pub fn format_status(status: &str, color: bool) -> String {
    if !color {
        return status.to_string();
    }

    use console::style;
    match status.to_lowercase().as_str() {
        "ok" | "success" | "succeeded" | "completed" | "done" => {
            style(status).green().to_string()
        }
        "failed" | "error" | "panicked" => style(status).red().to_string(),
        "timed out" | "cancelled" | "running" | "pending" | "queued" => {
            style(status).yellow().to_string()
        }
        _ => status.to_string(),
    }
}

/// Formats a boolean value as a human-readable Yes/No string.
pub fn format_bool(value: bool, color: bool) -> String {
    if color {
        use console::style;
        if value {
            style("Yes").green().to_string()
        } else {
            style("No").dim().to_string()
        }
    } else if value {
        "Yes".to_string()
    } else {
        "No".to_string()
    }
}

/// Truncates a string to at most `max_len` characters, ending in `...` when
/// there is room for it.
///
/// ```rust
/// use aem_cli::output::truncate;
///
/// assert_eq!(truncate("hello", 10), "hello");
/// assert_eq!(truncate("hello world", 8), "hello...");
/// assert_eq!(truncate("hello", 3), "hel");
/// ```
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Überschrift-Seite", 8), "Übers...");
        assert_eq!(truncate("ab", 2), "ab");
    }

    #[test]
    fn test_builder_renders_rows() {
        let table = TableBuilder::new()
            .color(false)
            .headers(["Key", "Value"])
            .rows([["enabled", "true"], ["ttl_seconds", "300"]])
            .build();
        let rendered = table.to_string();
        assert!(rendered.contains("ttl_seconds"));
        assert!(rendered.contains("300"));
    }

    #[test]
    fn test_format_without_color() {
        assert_eq!(format_status("FAILED", false), "FAILED");
        assert_eq!(format_bool(true, false), "Yes");
        assert_eq!(format_bool(false, false), "No");
    }
}
