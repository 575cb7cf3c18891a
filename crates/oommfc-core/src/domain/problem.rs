use super::dynamics::Dynamics;
use super::errors::{OommfcError, OommfcResult};
use super::terms::Energy;
use crate::field::{Field, Mesh};
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// A micromagnetic problem: the magnetisation, its energy and dynamics, and drive history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub name: String,
    pub m: Field,
    #[serde(default)]
    pub energy: Energy,
    #[serde(default)]
    pub dynamics: Dynamics,
    #[serde(skip)]
    pub drive_number: usize,
    #[serde(skip)]
    pub table: Option<Table>,
}

impl Problem {
    pub fn new(name: impl Into<String>, m: Field) -> Self {
        Self {
            name: name.into(),
            m,
            energy: Energy::default(),
            dynamics: Dynamics::default(),
            drive_number: 0,
            table: None,
        }
    }

    pub fn with_energy(mut self, energy: Energy) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_dynamics(mut self, dynamics: Dynamics) -> Self {
        self.dynamics = dynamics;
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.m.mesh
    }

    pub fn validate(&self) -> OommfcResult<()> {
        validate_problem_name(&self.name)?;
        if self.m.dim != 3 {
            return Err(OommfcError::invalid_parameter(
                "INPUT.MAGNETISATION_DIM",
                format!(
                    "magnetisation must have 3 components, got {}",
                    self.m.dim
                ),
            ));
        }
        self.mesh().validate()?;
        self.m.validate()?;
        self.energy.validate(self.mesh())?;
        self.dynamics.validate()
    }
}

pub(crate) fn validate_problem_name(name: &str) -> OommfcResult<()> {
    let legal = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || "_-.".contains(character));
    if legal {
        Ok(())
    } else {
        Err(OommfcError::invalid_parameter(
            "INPUT.PROBLEM_NAME",
            format!("problem name '{name}' is not a legal directory component"),
        ))
    }
}
