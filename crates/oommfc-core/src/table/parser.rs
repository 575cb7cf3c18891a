use super::Table;
use super::rename::rename_columns;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("table has no '# Columns' header line")]
    MissingColumns,
    #[error("line {line}: expected '# Units' after the columns header")]
    MissingUnits { line: usize },
    #[error("table declares {columns} columns but {units} units")]
    UnitCountMismatch { columns: usize, units: usize },
    #[error("line {line}: expected {expected} values, got {actual}")]
    RowWidth {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("line {line}: '{token}' is not a number")]
    InvalidNumber { line: usize, token: String },
}

/// Splits a header remainder into fields; a brace group is one field, spaces included.
pub fn split_header(text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_field = false;

    for character in text.chars() {
        match character {
            '{' => {
                if depth > 0 {
                    current.push(character);
                }
                depth += 1;
                in_field = true;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth > 0 {
                    current.push(character);
                }
            }
            character if character.is_whitespace() && depth == 0 => {
                if in_field {
                    fields.push(std::mem::take(&mut current));
                    in_field = false;
                }
            }
            character => {
                current.push(character);
                in_field = true;
            }
        }
    }
    if in_field {
        fields.push(current);
    }
    fields
}

fn header_remainder<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix('#')?.trim_start().strip_prefix(key)?;
    Some(rest.strip_prefix(':').unwrap_or(rest))
}

pub(super) fn parse(text: &str, rename: bool) -> Result<Table, TableError> {
    let mut lines = text.lines().enumerate();

    let columns = lines
        .by_ref()
        .find_map(|(_, line)| header_remainder(line.trim(), "Columns").map(split_header))
        .ok_or(TableError::MissingColumns)?;

    let units = match lines.next() {
        Some((index, line)) => header_remainder(line.trim(), "Units")
            .map(split_header)
            .ok_or(TableError::MissingUnits { line: index + 1 })?,
        None => return Err(TableError::MissingUnits { line: text.lines().count() + 1 }),
    };
    if units.len() != columns.len() {
        return Err(TableError::UnitCountMismatch {
            columns: columns.len(),
            units: units.len(),
        });
    }

    let mut rows = Vec::new();
    for (index, line) in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| TableError::InvalidNumber {
                    line: index + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if row.len() != columns.len() {
            return Err(TableError::RowWidth {
                line: index + 1,
                expected: columns.len(),
                actual: row.len(),
            });
        }
        rows.push(row);
    }

    let columns = if rename {
        rename_columns(&columns)
    } else {
        columns
    };
    Ok(Table {
        columns,
        units,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::{TableError, parse, split_header};

    #[test]
    fn brace_groups_keep_internal_spaces() {
        assert_eq!(
            split_header(" {Oxs_CGEvolve:evolver:Max mxHxm} Oxs_MinDriver::mx  {}"),
            vec![
                "Oxs_CGEvolve:evolver:Max mxHxm".to_string(),
                "Oxs_MinDriver::mx".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn units_must_follow_columns() {
        let error = parse("# Columns: a b\n# Title: x\n1 2\n", false).expect_err("units should be required");
        assert_eq!(error, TableError::MissingUnits { line: 2 });
    }

    #[test]
    fn rows_must_match_column_count() {
        let error = parse("# Columns: a b\n# Units: {} {}\n1 2\n3\n", false)
            .expect_err("short row should fail");
        assert_eq!(
            error,
            TableError::RowWidth {
                line: 4,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn non_numeric_values_are_reported() {
        let error = parse("# Columns: a\n# Units: {}\nnan?\n", false).expect_err("token should fail");
        assert!(matches!(error, TableError::InvalidNumber { line: 3, .. }));
    }
}
