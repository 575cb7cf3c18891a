use crate::domain::{OommfcError, OommfcResult};
use std::fs;
use std::path::Path;

/// Shortest round-trip rendering of `value`, switching to exponent form outside `[1e-4, 1e16)`.
pub fn format_number(value: f64) -> OommfcResult<String> {
    if !value.is_finite() {
        return Err(OommfcError::invalid_parameter(
            "INPUT.NON_FINITE",
            format!("cannot write non-finite value {value} to a script"),
        ));
    }
    let magnitude = value.abs();
    if magnitude == 0.0 {
        Ok("0".to_string())
    } else if (1e-4..1e16).contains(&magnitude) {
        Ok(format!("{value}"))
    } else {
        Ok(format!("{value:e}"))
    }
}

pub fn format_vector(value: [f64; 3]) -> OommfcResult<String> {
    Ok(format!(
        "{{{} {} {}}}",
        format_number(value[0])?,
        format_number(value[1])?,
        format_number(value[2])?
    ))
}

/// Renders `Specify <class>:<instance> { ... }` with one indented line per entry.
///
/// Nested braces inside entries are re-indented so blocks stay readable.
pub fn specify(class: &str, instance: Option<&str>, lines: &[String]) -> String {
    let label = match instance {
        Some(instance) => format!("{class}:{instance}"),
        None => class.to_string(),
    };
    if lines.is_empty() {
        return format!("Specify {label} {{}}\n\n");
    }
    let mut block = format!("Specify {label} {{\n");
    for line in lines {
        for row in line.lines() {
            block.push_str("  ");
            block.push_str(row);
            block.push('\n');
        }
    }
    block.push_str("}\n\n");
    block
}

/// Renders `<key> {` followed by the rows and a closing brace, for nesting inside [`specify`].
pub fn nested(key: &str, rows: &[String]) -> String {
    let mut text = format!("{key} {{\n");
    for row in rows {
        for line in row.lines() {
            text.push_str("  ");
            text.push_str(line);
            text.push('\n');
        }
    }
    text.push('}');
    text
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}
