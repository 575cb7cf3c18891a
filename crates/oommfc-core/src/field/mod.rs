mod mesh;
pub mod ovf;

pub use mesh::{Mesh, Region};
pub use ovf::FieldFormat;

use crate::domain::{OommfcError, OommfcResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cell-wise scalar (`dim == 1`) or vector (`dim == 3`) values on a mesh.
///
/// Values are interleaved per cell, cells ordered x fastest, then y, then z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub mesh: Mesh,
    pub dim: usize,
    pub values: Vec<f64>,
}

impl Field {
    pub fn new(mesh: Mesh, dim: usize, values: Vec<f64>) -> OommfcResult<Self> {
        let field = Self { mesh, dim, values };
        field.validate()?;
        Ok(field)
    }

    pub fn uniform(mesh: Mesh, value: &[f64]) -> OommfcResult<Self> {
        let values = value.repeat(mesh.n_cells());
        Self::new(mesh, value.len(), values)
    }

    pub fn from_fn(
        mesh: Mesh,
        dim: usize,
        mut value: impl FnMut([f64; 3]) -> Vec<f64>,
    ) -> OommfcResult<Self> {
        let mut values = Vec::with_capacity(mesh.n_cells() * dim);
        for centre in mesh.cell_centres() {
            let cell_value = value(centre);
            if cell_value.len() != dim {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.FIELD_DIM",
                    format!(
                        "field function returned {} components at {:?}, expected {}",
                        cell_value.len(),
                        centre,
                        dim
                    ),
                ));
            }
            values.extend(cell_value);
        }
        Self::new(mesh, dim, values)
    }

    pub fn validate(&self) -> OommfcResult<()> {
        if self.dim != 1 && self.dim != 3 {
            return Err(OommfcError::invalid_parameter(
                "INPUT.FIELD_DIM",
                format!("field must have 1 or 3 components, got {}", self.dim),
            ));
        }
        let expected = self.mesh.n_cells() * self.dim;
        if self.values.len() != expected {
            return Err(OommfcError::invalid_parameter(
                "INPUT.FIELD_LENGTH",
                format!(
                    "field holds {} values, mesh needs {}",
                    self.values.len(),
                    expected
                ),
            ));
        }
        if let Some(value) = self.values.iter().find(|value| !value.is_finite()) {
            return Err(OommfcError::invalid_parameter(
                "INPUT.FIELD_VALUE",
                format!("field contains non-finite value {value}"),
            ));
        }
        Ok(())
    }

    /// Rescales every non-zero vector to magnitude `norm`.
    pub fn normalised(mut self, norm: f64) -> OommfcResult<Self> {
        if self.dim != 3 {
            return Err(OommfcError::invalid_parameter(
                "INPUT.FIELD_DIM",
                "only vector fields can be normalised",
            ));
        }
        for cell in self.values.chunks_exact_mut(3) {
            let magnitude = cell.iter().map(|component| component * component).sum::<f64>().sqrt();
            if magnitude > 0.0 {
                for component in cell.iter_mut() {
                    *component *= norm / magnitude;
                }
            }
        }
        Ok(self)
    }

    pub fn average(&self) -> Vec<f64> {
        let cells = self.mesh.n_cells().max(1) as f64;
        let mut sum = vec![0.0; self.dim];
        for cell in self.values.chunks_exact(self.dim) {
            for (total, component) in sum.iter_mut().zip(cell) {
                *total += component;
            }
        }
        sum.into_iter().map(|total| total / cells).collect()
    }

    /// Cell-wise magnitude.
    pub fn norm(&self) -> Vec<f64> {
        self.values
            .chunks_exact(self.dim)
            .map(|cell| cell.iter().map(|component| component * component).sum::<f64>().sqrt())
            .collect()
    }

    /// Takes the values of `other`, which must share this field's shape.
    pub fn assign_values(&mut self, other: Field) -> OommfcResult<()> {
        if other.dim != self.dim || other.mesh.n() != self.mesh.n() {
            return Err(OommfcError::parse_failure(
                "RUN.FIELD_SHAPE",
                format!(
                    "field with {} components on {:?} cells cannot replace {} components on {:?} cells",
                    other.dim,
                    other.mesh.n(),
                    self.dim,
                    self.mesh.n()
                ),
            ));
        }
        self.values = other.values;
        Ok(())
    }

    pub fn write(&self, path: &Path, format: FieldFormat) -> OommfcResult<()> {
        ovf::write(self, path, format, false)
    }

    /// Writes a scalar field as vectors `(v, 0, 0)` for the engine's vector-field reader.
    pub fn write_extended(&self, path: &Path, format: FieldFormat) -> OommfcResult<()> {
        ovf::write(self, path, format, true)
    }

    pub fn read(path: &Path) -> OommfcResult<Self> {
        ovf::read(path)
    }
}
