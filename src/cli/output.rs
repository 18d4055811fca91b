//! Rendering of command results as tables or JSON.

use std::collections::BTreeSet;

use anyhow::Context;
use clap::ValueEnum;
use relief::Criteria;
use serde::Serialize;

use crate::cli::terminal;

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Output flags shared by every listing.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Format {
    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    pub output: OutputFormat,

    /// Print only ids, one per line.
    #[arg(short, long, conflicts_with = "output")]
    pub quiet: bool,
}

/// Narrowing flags shared by every listing.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Filters {
    /// Case-insensitive text to search for.
    #[arg(short, long)]
    search: Option<String>,

    /// Keep items carrying any of these tags (comma-separated).
    #[arg(short, long = "tag", value_delimiter = ',', value_name = "TAG")]
    tags: Vec<String>,

    /// Keep items with this status (or severity, for disasters).
    #[arg(long, visible_alias = "severity")]
    status: Option<String>,
}

impl Filters {
    pub fn criteria(&self) -> Criteria {
        let mut criteria = Criteria::new().tags(&self.tags);
        if let Some(search) = &self.search {
            criteria = criteria.query(search);
        }
        if let Some(status) = &self.status {
            criteria = criteria.status(status);
        }
        criteria
    }
}

/// Column-aligned text output.
#[derive(Debug)]
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub const fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn print(&self) {
        let limit = terminal::is_narrow().then_some(NARROW_CELL);
        print!("{}", self.render(limit));
    }

    /// Render the table, cutting cells longer than `limit` characters.
    fn render(&self, limit: Option<usize>) -> String {
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| limit.map_or_else(|| cell.clone(), |max| truncate(cell, max)))
                    .collect()
            })
            .collect();

        // Determine column widths for alignment.
        let widths = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                rows.iter()
                    .map(|row| row[idx].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(header.len())
            })
            .collect::<Vec<_>>();

        let mut out = String::new();
        for (header, width) in self.headers.iter().zip(&widths) {
            out.push_str(&format!("{header:<width$}  "));
        }
        out.push('\n');
        for width in &widths {
            out.push_str(&format!("{:-<width$}  ", ""));
        }
        out.push('\n');

        for row in rows {
            for (value, width) in row.iter().zip(&widths) {
                out.push_str(&format!("{value:<width$}  "));
            }
            out.push('\n');
        }
        out
    }
}

const NARROW_CELL: usize = 24;

/// Shorten `text` to at most `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(std::io::stdout(), value)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

pub fn optional(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn joined(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Print a labelled field of a detail view, skipping absent values.
pub fn field(label: &str, value: Option<impl std::fmt::Display>) {
    if let Some(value) = value {
        println!("{:<12} {value}", format!("{label}:"));
    }
}

#[cfg(test)]
mod tests {
    use relief::domain::Disaster;

    use super::*;

    #[test]
    fn columns_are_aligned_to_widest_cell() {
        let mut table = Table::new(vec!["ID", "TITLE"]);
        table.push(vec!["1".to_string(), "Flood".to_string()]);
        table.push(vec!["22".to_string(), "Wildfire".to_string()]);

        let rendered = table.render(None);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "ID  TITLE     ");
        assert_eq!(lines[1], "--  --------  ");
        assert_eq!(lines[3], "22  Wildfire  ");
    }

    #[test]
    fn narrow_rendering_cuts_long_cells() {
        let mut table = Table::new(vec!["TITLE"]);
        table.push(vec!["Hurricane landfall on the coast".to_string()]);

        let rendered = table.render(Some(10));

        assert!(rendered.contains("Hurricane…"));
    }

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate("flood", 5), "flood");
        assert_eq!(truncate("flooding", 5), "floo…");
    }

    #[test]
    fn filters_build_criteria() {
        let filters = Filters {
            search: Some("river".to_string()),
            tags: vec!["Flood".to_string()],
            status: Some("high".to_string()),
        };
        let disaster: Disaster = serde_json::from_value(serde_json::json!({
            "id": "1",
            "title": "River flood",
            "severity": "HIGH",
            "tags": ["flood"],
        }))
        .unwrap();

        assert!(filters.criteria().matches(&disaster));
        assert!(Filters::default().criteria().is_empty());
    }

    #[test]
    fn empty_tags_render_as_dash() {
        assert_eq!(joined(&BTreeSet::new()), "-");
        assert_eq!(
            joined(&["a".to_string(), "b".to_string()].into()),
            "a, b"
        );
    }
}
