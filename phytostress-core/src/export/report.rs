//! Plain-text report: a banner, then each table as aligned columns.

use std::path::Path;

use crate::analytics::Table;
use crate::error::Result;

pub const ANALYSIS_BANNER: &str = "PLANT STRESS PHYSIOLOGY - ANALYSIS DATA";
pub const COMPREHENSIVE_BANNER: &str = "PLANT STRESS PHYSIOLOGY - COMPREHENSIVE DATA EXPORT";

/// Render the report text
pub fn render(banner: &str, tables: &[Table]) -> String {
    let mut out = String::new();
    out.push_str(banner);
    out.push('\n');
    out.push_str(&"=".repeat(banner.chars().count().max(50)));
    out.push_str("\n\n");

    for table in tables {
        out.push_str(&table.title.to_uppercase());
        out.push_str(":\n");
        out.push_str(&"-".repeat(40));
        out.push('\n');
        render_table(&mut out, table);
        out.push('\n');
    }
    out
}

/// Append `table`'s header and rows. Columns are right-aligned to their
/// widest cell.
pub fn render_table(out: &mut String, table: &Table) {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.display()).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{:>w$}", name))
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');

    if cells.is_empty() {
        out.push_str("(no rows)\n");
        return;
    }

    for values in &cells {
        let line: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(text, &w)| format!("{:>w$}", text))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
}

/// Write the report to `path`
pub fn write_report(path: &Path, banner: &str, tables: &[Table]) -> Result<()> {
    std::fs::write(path, render(banner, tables))?;
    tracing::debug!(path = %path.display(), tables = tables.len(), "Wrote text report");
    Ok(())
}
