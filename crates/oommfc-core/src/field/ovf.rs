//! OOMMF vector field files (`.omf`, `.ohf`, `.oef`, `.ovf`).
//!
//! Files are written as OVF 2.0. Reading accepts OVF 2.0 (little-endian binary) and
//! OVF 1.0 (big-endian binary), which older engine builds still emit.

use super::{Field, Mesh, Region};
use crate::domain::{OommfcError, OommfcResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

const BINARY4_CHECK: f32 = 1_234_567.0;
const BINARY8_CHECK: f64 = 123_456_789_012_345.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Text,
    Binary4,
    #[default]
    Binary8,
}

impl FieldFormat {
    /// Value of the engine's `*_field_output_format` option.
    pub const fn mif_format(self) -> &'static str {
        match self {
            Self::Text => "text %#.15g",
            Self::Binary4 => "binary 4",
            Self::Binary8 => "binary 8",
        }
    }

    const fn data_label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Binary4 => "Binary 4",
            Self::Binary8 => "Binary 8",
        }
    }
}

impl Display for FieldFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Binary4 => "binary4",
            Self::Binary8 => "binary8",
        })
    }
}

impl FromStr for FieldFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "binary4" | "bin4" => Ok(Self::Binary4),
            "binary8" | "bin8" => Ok(Self::Binary8),
            other => Err(format!(
                "unknown field format '{other}', expected binary4, binary8 or text"
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OvfError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' is not an OVF file")]
    NotOvf(String),
    #[error("header of '{path}' is missing '{key}'")]
    MissingHeader { path: String, key: &'static str },
    #[error("header value '{key}: {value}' in '{path}' is invalid")]
    InvalidHeader {
        path: String,
        key: String,
        value: String,
    },
    #[error("unsupported data block '{block}' in '{path}'")]
    UnsupportedData { path: String, block: String },
    #[error("data check value in '{path}' is {found}, expected {expected}")]
    CheckValue {
        path: String,
        found: f64,
        expected: f64,
    },
    #[error("'{path}' ends before all {expected} values were read")]
    Truncated { path: String, expected: usize },
}

impl From<OvfError> for OommfcError {
    fn from(error: OvfError) -> Self {
        match &error {
            OvfError::Io { source, .. } => {
                OommfcError::from_io("IO.OVF", "OVF file access failed", source)
            }
            _ => OommfcError::parse_failure("PARSE.OVF", error.to_string()),
        }
    }
}

pub(super) fn write(
    field: &Field,
    path: &Path,
    format: FieldFormat,
    extend_scalar: bool,
) -> OommfcResult<()> {
    write_ovf2(field, path, format, extend_scalar).map_err(|source| {
        OvfError::Io {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

fn write_ovf2(
    field: &Field,
    path: &Path,
    format: FieldFormat,
    extend_scalar: bool,
) -> std::io::Result<()> {
    let mesh = &field.mesh;
    let [nx, ny, nz] = mesh.n();
    let valuedim = if extend_scalar && field.dim == 1 { 3 } else { field.dim };
    let title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("field");

    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "# OOMMF OVF 2.0")?;
    writeln!(w, "#")?;
    writeln!(w, "# Segment count: 1")?;
    writeln!(w, "#")?;
    writeln!(w, "# Begin: Segment")?;
    writeln!(w, "# Begin: Header")?;
    writeln!(w, "#")?;
    writeln!(w, "# Title: {title}")?;
    writeln!(w, "# meshtype: rectangular")?;
    writeln!(w, "# meshunit: m")?;
    writeln!(w, "#")?;
    for (axis, label) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {label}min: {:e}", mesh.region.p1[axis])?;
    }
    for (axis, label) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {label}max: {:e}", mesh.region.p2[axis])?;
    }
    writeln!(w, "#")?;
    writeln!(w, "# valuedim: {valuedim}")?;
    if valuedim == 3 {
        writeln!(w, "# valuelabels: {title}_x {title}_y {title}_z")?;
        writeln!(w, "# valueunits: A/m A/m A/m")?;
    } else {
        writeln!(w, "# valuelabels: {title}")?;
        writeln!(w, "# valueunits: 1")?;
    }
    writeln!(w, "#")?;
    for (axis, label) in ["x", "y", "z"].iter().enumerate() {
        writeln!(
            w,
            "# {label}base: {:e}",
            mesh.region.p1[axis] + 0.5 * mesh.cell[axis]
        )?;
    }
    writeln!(w, "#")?;
    writeln!(w, "# xnodes: {nx}")?;
    writeln!(w, "# ynodes: {ny}")?;
    writeln!(w, "# znodes: {nz}")?;
    writeln!(w, "#")?;
    for (axis, label) in ["x", "y", "z"].iter().enumerate() {
        writeln!(w, "# {label}stepsize: {:e}", mesh.cell[axis])?;
    }
    writeln!(w, "#")?;
    writeln!(w, "# End: Header")?;
    writeln!(w, "#")?;
    writeln!(w, "# Begin: Data {}", format.data_label())?;

    let cells = field.values.chunks_exact(field.dim).map(|cell| {
        let mut value = [0.0; 3];
        value[..cell.len()].copy_from_slice(cell);
        (value, if valuedim == 3 { 3 } else { 1 })
    });

    match format {
        FieldFormat::Text => {
            for (value, width) in cells {
                let line = value[..width]
                    .iter()
                    .map(|component| format!("{component:.15e}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(w, "{line}")?;
            }
        }
        FieldFormat::Binary4 => {
            w.write_all(&BINARY4_CHECK.to_le_bytes())?;
            for (value, width) in cells {
                for component in &value[..width] {
                    w.write_all(&(*component as f32).to_le_bytes())?;
                }
            }
            writeln!(w)?;
        }
        FieldFormat::Binary8 => {
            w.write_all(&BINARY8_CHECK.to_le_bytes())?;
            for (value, width) in cells {
                for component in &value[..width] {
                    w.write_all(&component.to_le_bytes())?;
                }
            }
            writeln!(w)?;
        }
    }

    writeln!(w, "# End: Data {}", format.data_label())?;
    writeln!(w, "# End: Segment")?;
    w.flush()
}

pub(super) fn read(path: &Path) -> OommfcResult<Field> {
    let bytes = std::fs::read(path).map_err(|source| OvfError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse(&bytes, &path.display().to_string())?)
}

struct Header {
    big_endian: bool,
    entries: BTreeMap<String, String>,
}

impl Header {
    fn float(&self, path: &str, key: &'static str) -> Result<f64, OvfError> {
        let value = self.entries.get(key).ok_or(OvfError::MissingHeader {
            path: path.to_string(),
            key,
        })?;
        value.parse::<f64>().map_err(|_| OvfError::InvalidHeader {
            path: path.to_string(),
            key: key.to_string(),
            value: value.clone(),
        })
    }

    fn count(&self, path: &str, key: &'static str) -> Result<usize, OvfError> {
        let value = self.entries.get(key).ok_or(OvfError::MissingHeader {
            path: path.to_string(),
            key,
        })?;
        value.parse::<usize>().map_err(|_| OvfError::InvalidHeader {
            path: path.to_string(),
            key: key.to_string(),
            value: value.clone(),
        })
    }
}

fn parse(bytes: &[u8], path: &str) -> Result<Field, OvfError> {
    let mut offset = 0;
    let mut header: Option<Header> = None;

    while offset < bytes.len() {
        let end = bytes[offset..]
            .iter()
            .position(|byte| *byte == b'\n')
            .map_or(bytes.len(), |position| offset + position);
        let line = String::from_utf8_lossy(&bytes[offset..end]);
        let line = line.trim();
        offset = (end + 1).min(bytes.len());

        let Some(content) = line.strip_prefix('#') else {
            continue;
        };
        let content = content.trim();

        if header.is_none() {
            let lowered = content.to_ascii_lowercase();
            if lowered.starts_with("oommf ovf 2") {
                header = Some(Header {
                    big_endian: false,
                    entries: BTreeMap::new(),
                });
                continue;
            }
            if lowered.starts_with("oommf: rectangular mesh v1") || lowered.starts_with("oommf ovf 1") {
                header = Some(Header {
                    big_endian: true,
                    entries: BTreeMap::new(),
                });
                continue;
            }
            return Err(OvfError::NotOvf(path.to_string()));
        }

        let Some((key, value)) = content.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();

        if key == "begin" && value.to_ascii_lowercase().starts_with("data") {
            let block = value["data".len()..].trim().to_ascii_lowercase();
            let Some(header) = header else {
                return Err(OvfError::NotOvf(path.to_string()));
            };
            return read_data(&header, &block, &bytes[offset..], path);
        }

        if let Some(header) = header.as_mut() {
            header.entries.insert(key, value);
        }
    }

    Err(OvfError::MissingHeader {
        path: path.to_string(),
        key: "Begin: Data",
    })
}

fn read_data(header: &Header, block: &str, data: &[u8], path: &str) -> Result<Field, OvfError> {
    let p1 = [
        header.float(path, "xmin")?,
        header.float(path, "ymin")?,
        header.float(path, "zmin")?,
    ];
    let p2 = [
        header.float(path, "xmax")?,
        header.float(path, "ymax")?,
        header.float(path, "zmax")?,
    ];
    let cell = [
        header.float(path, "xstepsize")?,
        header.float(path, "ystepsize")?,
        header.float(path, "zstepsize")?,
    ];
    let valuedim = if header.entries.contains_key("valuedim") {
        header.count(path, "valuedim")?
    } else {
        3
    };
    let multiplier = if header.entries.contains_key("valuemultiplier") {
        header.float(path, "valuemultiplier")?
    } else {
        1.0
    };

    let invalid_geometry = |message: String| OvfError::InvalidHeader {
        path: path.to_string(),
        key: "geometry".to_string(),
        value: message,
    };
    let region = Region::new(p1, p2).map_err(|error| invalid_geometry(error.message().to_string()))?;
    let mesh = Mesh::new(region, cell).map_err(|error| invalid_geometry(error.message().to_string()))?;
    let expected = mesh.n_cells() * valuedim;

    let mut values = match block {
        "text" => read_text(data, expected, path)?,
        "binary 4" => read_binary(data, expected, 4, header.big_endian, path)?,
        "binary 8" => read_binary(data, expected, 8, header.big_endian, path)?,
        other => {
            return Err(OvfError::UnsupportedData {
                path: path.to_string(),
                block: other.to_string(),
            });
        }
    };
    if multiplier != 1.0 {
        for value in &mut values {
            *value *= multiplier;
        }
    }

    Field::new(mesh, valuedim, values).map_err(|error| OvfError::InvalidHeader {
        path: path.to_string(),
        key: "valuedim".to_string(),
        value: error.message().to_string(),
    })
}

fn read_text(data: &[u8], expected: usize, path: &str) -> Result<Vec<f64>, OvfError> {
    let text = String::from_utf8_lossy(data);
    let mut values = Vec::with_capacity(expected);
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            if line.to_ascii_lowercase().contains("end: data") {
                break;
            }
            continue;
        }
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| OvfError::InvalidHeader {
                path: path.to_string(),
                key: "data".to_string(),
                value: token.to_string(),
            })?;
            values.push(value);
        }
    }
    if values.len() < expected {
        return Err(OvfError::Truncated {
            path: path.to_string(),
            expected,
        });
    }
    values.truncate(expected);
    Ok(values)
}

fn read_binary(
    data: &[u8],
    expected: usize,
    width: usize,
    big_endian: bool,
    path: &str,
) -> Result<Vec<f64>, OvfError> {
    if data.len() < width * (expected + 1) {
        return Err(OvfError::Truncated {
            path: path.to_string(),
            expected,
        });
    }
    let decode = |chunk: &[u8]| -> f64 {
        if width == 4 {
            let mut raw = [0_u8; 4];
            raw.copy_from_slice(chunk);
            f64::from(if big_endian {
                f32::from_be_bytes(raw)
            } else {
                f32::from_le_bytes(raw)
            })
        } else {
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(chunk);
            if big_endian {
                f64::from_be_bytes(raw)
            } else {
                f64::from_le_bytes(raw)
            }
        }
    };

    let check = decode(&data[..width]);
    let expected_check = if width == 4 {
        f64::from(BINARY4_CHECK)
    } else {
        BINARY8_CHECK
    };
    if check != expected_check {
        return Err(OvfError::CheckValue {
            path: path.to_string(),
            found: check,
            expected: expected_check,
        });
    }

    Ok(data[width..width * (expected + 1)]
        .chunks_exact(width)
        .map(decode)
        .collect())
}
