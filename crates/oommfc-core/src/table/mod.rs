//! Parsing of the engine's `.odt` data tables.

mod parser;
mod rename;

pub use parser::{TableError, split_header};
pub use rename::{rename_columns, short_name};

use crate::domain::{OommfcError, OommfcResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Column names, their units, and row-major values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub units: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    pub fn last_value(&self, name: &str) -> Option<f64> {
        let index = self.column_index(name)?;
        self.rows.last().map(|row| row[index])
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        let index = self.column_index(name)?;
        self.units.get(index).map(String::as_str)
    }
}

impl From<TableError> for OommfcError {
    fn from(error: TableError) -> Self {
        OommfcError::parse_failure("PARSE.TABLE", error.to_string())
    }
}

pub fn parse_table(text: &str, rename: bool) -> OommfcResult<Table> {
    Ok(parser::parse(text, rename)?)
}

pub fn read_table(path: &Path, rename: bool) -> OommfcResult<Table> {
    let text = fs::read_to_string(path)
        .map_err(|error| OommfcError::from_io("IO.TABLE", format!("failed to read {}", path.display()), &error))?;
    parse_table(&text, rename).map_err(|error| {
        OommfcError::parse_failure(
            error.placeholder(),
            format!("{}: {}", path.display(), error.message()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_table, read_table};
    use crate::domain::OommfcErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    const MIN_DRIVE: &str = "# ODT 1.0\n\
# Table Start\n\
# Title: mmArchive Data Table\n\
# Columns: {Oxs_CGEvolve::Max mxHxm} {Oxs_CGEvolve::Total energy} Oxs_MinDriver::Iteration {Oxs_UniformExchange:exchange:Max Spin Ang} Oxs_MinDriver::mx\n\
# Units: {A/m} J {} deg {}\n\
  1.5e-3 -2.5e-19 12 0.5 0.99\n\
  2.0e-4 -2.6e-19 30 0.4 1.0\n\
# Table End\n";

    #[test]
    fn raw_and_renamed_tables_share_rows() {
        let raw = parse_table(MIN_DRIVE, false).expect("raw table should parse");
        let renamed = parse_table(MIN_DRIVE, true).expect("renamed table should parse");

        assert_eq!(raw.rows, renamed.rows);
        assert_eq!(raw.column_count(), renamed.column_count());
        assert_eq!(raw.columns[0], "Oxs_CGEvolve::Max mxHxm");
        assert_eq!(raw.columns[3], "Oxs_UniformExchange:exchange:Max Spin Ang");
        assert_eq!(
            renamed.columns,
            vec!["max_mxHxm", "E", "iteration", "max_spin_ang", "mx"]
        );
        assert_eq!(renamed.units[0], "A/m");
        assert_eq!(renamed.unit("iteration"), Some(""));
        assert_eq!(renamed.last_value("E"), Some(-2.6e-19));
        assert_eq!(renamed.column("mx"), Some(vec![0.99, 1.0]));
        assert_eq!(renamed.row_count(), 2);
    }

    #[test]
    fn header_violations_are_parse_failures() {
        let error = parse_table("1 2 3\n", true).expect_err("missing header should fail");
        assert_eq!(error.category(), OommfcErrorCategory::ParseFailure);

        let error = parse_table("# Columns: a b c\n# Units: {} {}\n", true)
            .expect_err("unit mismatch should fail");
        assert_eq!(error.category(), OommfcErrorCategory::ParseFailure);
        assert!(error.message().contains("3 columns but 2 units"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = read_table(&temp.path().join("absent.odt"), true).expect_err("missing file should fail");
        assert_eq!(error.category(), OommfcErrorCategory::NotFound);

        let path = temp.path().join("broken.odt");
        fs::write(&path, "# Columns: a\n").expect("fixture should write");
        let error = read_table(&path, false).expect_err("truncated header should fail");
        assert!(error.message().contains("broken.odt"));
    }
}
