use crate::domain::{OommfcError, OommfcResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const AXES: [char; 3] = ['x', 'y', 'z'];
const RELATIVE_TOLERANCE: f64 = 1e-6;

/// Axis-aligned box between `p1` (minimum corner) and `p2` (maximum corner), in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub p1: [f64; 3],
    pub p2: [f64; 3],
}

impl Region {
    pub fn new(p1: [f64; 3], p2: [f64; 3]) -> OommfcResult<Self> {
        let region = Self { p1, p2 };
        region.validate()?;
        Ok(region)
    }

    pub fn validate(&self) -> OommfcResult<()> {
        for axis in 0..3 {
            let (low, high) = (self.p1[axis], self.p2[axis]);
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.REGION_BOUNDS",
                    format!(
                        "region {} bounds must satisfy p1 < p2, got {} and {}",
                        AXES[axis], low, high
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn edges(&self) -> [f64; 3] {
        [
            self.p2[0] - self.p1[0],
            self.p2[1] - self.p1[1],
            self.p2[2] - self.p1[2],
        ]
    }

    pub fn contains(&self, other: &Region, tolerance: f64) -> bool {
        (0..3).all(|axis| {
            other.p1[axis] >= self.p1[axis] - tolerance && other.p2[axis] <= self.p2[axis] + tolerance
        })
    }
}

/// Rectangular finite-difference mesh with optional named subregions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub region: Region,
    pub cell: [f64; 3],
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subregions: BTreeMap<String, Region>,
    /// Periodic axes, some subset of `xyz`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bc: String,
}

impl Mesh {
    pub fn new(region: Region, cell: [f64; 3]) -> OommfcResult<Self> {
        let mesh = Self {
            region,
            cell,
            subregions: BTreeMap::new(),
            bc: String::new(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn with_subregion(mut self, name: impl Into<String>, region: Region) -> OommfcResult<Self> {
        self.subregions.insert(name.into(), region);
        self.validate()?;
        Ok(self)
    }

    pub fn with_bc(mut self, bc: impl Into<String>) -> OommfcResult<Self> {
        self.bc = bc.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> OommfcResult<()> {
        self.region.validate()?;
        let edges = self.region.edges();
        for axis in 0..3 {
            let cell = self.cell[axis];
            if !(cell.is_finite() && cell > 0.0) {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.MESH_CELL",
                    format!("cell size along {} must be positive, got {}", AXES[axis], cell),
                ));
            }
            let count = edges[axis] / cell;
            if count.round() < 1.0 || (count - count.round()).abs() > RELATIVE_TOLERANCE * count.max(1.0) {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.MESH_CELL",
                    format!(
                        "region edge {} along {} is not an integer multiple of cell size {}",
                        edges[axis], AXES[axis], cell
                    ),
                ));
            }
        }

        let tolerance = self.tolerance();
        for (name, subregion) in &self.subregions {
            if !crate::domain::is_identifier(name) || name == "entire" || name == "main" {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.SUBREGION_NAME",
                    format!("subregion name '{name}' is not usable as an atlas region"),
                ));
            }
            subregion.validate()?;
            if !self.region.contains(subregion, tolerance) {
                return Err(OommfcError::invalid_parameter(
                    "INPUT.SUBREGION_BOUNDS",
                    format!("subregion '{name}' lies outside the mesh region"),
                ));
            }
        }

        if let Some(invalid) = self.bc.chars().find(|axis| !AXES.contains(axis)) {
            return Err(OommfcError::invalid_parameter(
                "INPUT.MESH_BC",
                format!("boundary condition '{}' contains unknown axis '{}'", self.bc, invalid),
            ));
        }
        Ok(())
    }

    /// Number of cells along each axis.
    pub fn n(&self) -> [usize; 3] {
        let edges = self.region.edges();
        [0, 1, 2].map(|axis| (edges[axis] / self.cell[axis]).round() as usize)
    }

    pub fn n_cells(&self) -> usize {
        self.n().iter().product()
    }

    pub fn cell_centre(&self, index: [usize; 3]) -> [f64; 3] {
        [0, 1, 2].map(|axis| self.region.p1[axis] + (index[axis] as f64 + 0.5) * self.cell[axis])
    }

    /// Cell centres with x varying fastest, then y, then z.
    pub fn cell_centres(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        let [nx, ny, nz] = self.n();
        (0..nz).flat_map(move |k| {
            (0..ny).flat_map(move |j| (0..nx).map(move |i| self.cell_centre([i, j, k])))
        })
    }

    /// Sorted, de-duplicated periodic axes, e.g. `"xz"`.
    pub fn periodic_axes(&self) -> String {
        AXES.iter().filter(|axis| self.bc.contains(**axis)).collect()
    }

    /// Length tolerance for geometric comparisons on this mesh.
    pub fn tolerance(&self) -> f64 {
        self.cell.iter().copied().fold(f64::INFINITY, f64::min) * 1e-3
    }

    /// Region names a per-region parameter may use.
    pub fn region_names(&self) -> Vec<&str> {
        if self.subregions.is_empty() {
            vec!["main"]
        } else {
            self.subregions
                .keys()
                .map(String::as_str)
                .chain(std::iter::once("entire"))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mesh, Region};
    use crate::domain::OommfcErrorCategory;

    fn region(p1: [f64; 3], p2: [f64; 3]) -> Region {
        Region::new(p1, p2).expect("region should be valid")
    }

    #[test]
    fn cell_counts_round_to_integer_divisions() {
        let mesh = Mesh::new(region([0.0, 0.0, 0.0], [100e-9, 50e-9, 5e-9]), [5e-9, 5e-9, 5e-9])
            .expect("mesh should be valid");
        assert_eq!(mesh.n(), [20, 10, 1]);
        assert_eq!(mesh.n_cells(), 200);
    }

    #[test]
    fn centres_iterate_x_fastest() {
        let mesh = Mesh::new(region([0.0, 0.0, 0.0], [2.0, 2.0, 1.0]), [1.0, 1.0, 1.0])
            .expect("mesh should be valid");
        let centres: Vec<[f64; 3]> = mesh.cell_centres().collect();
        assert_eq!(
            centres,
            vec![
                [0.5, 0.5, 0.5],
                [1.5, 0.5, 0.5],
                [0.5, 1.5, 0.5],
                [1.5, 1.5, 0.5]
            ]
        );
    }

    #[test]
    fn inverted_region_is_rejected() {
        let error = Region::new([1.0, 0.0, 0.0], [0.0, 1.0, 1.0]).expect_err("p1 > p2 should fail");
        assert_eq!(error.category(), OommfcErrorCategory::InvalidParameter);
    }

    #[test]
    fn periodic_axes_are_sorted() {
        let mesh = Mesh::new(region([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]), [1.0, 1.0, 1.0])
            .and_then(|mesh| mesh.with_bc("zx"))
            .expect("mesh should be valid");
        assert_eq!(mesh.periodic_axes(), "xz");

        let error = Mesh::new(region([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]), [1.0, 1.0, 1.0])
            .and_then(|mesh| mesh.with_bc("neumann"))
            .expect_err("unknown bc should fail");
        assert_eq!(error.placeholder(), "INPUT.MESH_BC");
    }

    #[test]
    fn subregions_must_fit_inside_region() {
        let mesh = Mesh::new(region([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]), [1.0, 1.0, 1.0])
            .expect("mesh should be valid");
        let error = mesh
            .with_subregion("outside", region([0.0, 0.0, 0.0], [3.0, 1.0, 1.0]))
            .expect_err("subregion outside mesh should fail");
        assert_eq!(error.placeholder(), "INPUT.SUBREGION_BOUNDS");
    }

    #[test]
    fn region_names_depend_on_subregions() {
        let mesh = Mesh::new(region([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]), [1.0, 1.0, 1.0])
            .expect("mesh should be valid");
        assert_eq!(mesh.region_names(), vec!["main"]);

        let mesh = mesh
            .with_subregion("r1", region([0.0, 0.0, 0.0], [1.0, 2.0, 2.0]))
            .expect("subregion should fit");
        assert_eq!(mesh.region_names(), vec!["r1", "entire"]);
    }
}
