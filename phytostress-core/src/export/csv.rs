//! Delimited text: one CSV file per table.

use std::path::{Path, PathBuf};

use crate::analytics::Table;
use crate::error::Result;

/// File name for one table next to `base`: `<base>_<slug>.csv`.
///
/// A `.csv` extension on `base` is dropped first.
pub fn table_path(base: &Path, table: &Table) -> PathBuf {
    let stem = match base.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => base.with_extension(""),
        _ => base.to_path_buf(),
    };
    let mut name = stem.file_name().unwrap_or_default().to_os_string();
    name.push(format!("_{}.csv", table.slug()));
    stem.with_file_name(name)
}

/// Write a single table with a header row
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer = ::csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.display()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every table to its own file and return the paths in table order
pub fn write_tables(base: &Path, tables: &[Table]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let path = table_path(base, table);
        write_table(&path, table)?;
        tracing::debug!(path = %path.display(), rows = table.rows.len(), "Wrote CSV table");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Cell;

    #[test]
    fn test_table_path() {
        let table = Table::new("Stress Impact", &[]);
        assert_eq!(
            table_path(Path::new("/out/exp1.csv"), &table),
            PathBuf::from("/out/exp1_stress_impact.csv")
        );
        assert_eq!(
            table_path(Path::new("report"), &table),
            PathBuf::from("report_stress_impact.csv")
        );
    }

    #[test]
    fn test_write_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::new("Statistics", &["treatment_name", "avg_height", "notes"]);
        table.push_row(vec![
            Cell::from("Drought-High"),
            Cell::Real(12.5),
            Cell::from("leaves, curled"),
        ]);
        table.push_row(vec![Cell::from("Control"), Cell::Null, Cell::Null]);

        let paths = write_tables(&dir.path().join("exp.csv"), &[table]).unwrap();
        assert_eq!(paths, vec![dir.path().join("exp_statistics.csv")]);

        let content = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(
            content,
            "treatment_name,avg_height,notes\nDrought-High,12.5,\"leaves, curled\"\nControl,,\n"
        );
    }
}
