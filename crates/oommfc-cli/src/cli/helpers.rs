use super::CliError;
use anyhow::Context;
use oommfc_core::domain::{DriveIntent, Dynamics, Energy, OommfcError, Problem};
use oommfc_core::field::{Field, Mesh};
use oommfc_core::runner::CommandRunner;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub(super) const ENGINE_ENV: &str = "OOMMF_COMMAND";

/// Uniform initial magnetisation, optionally scaled to `norm`.
#[derive(Debug, Deserialize)]
pub(super) struct InitialMagnetisation {
    pub(super) value: [f64; 3],
    #[serde(default)]
    pub(super) norm: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProblemSpec {
    pub(super) name: String,
    pub(super) mesh: Mesh,
    pub(super) m: InitialMagnetisation,
    #[serde(default)]
    pub(super) energy: Energy,
    #[serde(default)]
    pub(super) dynamics: Dynamics,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProblemDocument {
    pub(super) problem: ProblemSpec,
    #[serde(default = "DriveIntent::minimise")]
    pub(super) intent: DriveIntent,
}

impl ProblemSpec {
    pub(super) fn build(self) -> Result<Problem, CliError> {
        self.mesh.validate()?;
        let mut m = Field::uniform(self.mesh, &self.m.value)?;
        if let Some(norm) = self.m.norm {
            m = m.normalised(norm)?;
        }
        Ok(Problem::new(self.name, m)
            .with_energy(self.energy)
            .with_dynamics(self.dynamics))
    }
}

pub(super) fn read_document(path: &Path) -> Result<(Problem, DriveIntent), CliError> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read problem document {}", path.display()))?;
    let document: ProblemDocument = serde_json::from_str(&text).map_err(|source| {
        OommfcError::parse_failure(
            "PARSE.PROBLEM_DOCUMENT",
            format!("{} is not a problem document: {source}", path.display()),
        )
    })?;
    Ok((document.problem.build()?, document.intent))
}

pub(super) fn engine_runner(engine: Option<String>) -> Result<CommandRunner, CliError> {
    let command = match engine {
        Some(command) => command,
        None => std::env::var(ENGINE_ENV).map_err(|_| {
            CliError::Usage(format!(
                "no engine command given; pass --engine or set {ENGINE_ENV}"
            ))
        })?,
    };
    Ok(CommandRunner::from_command_line(&command)?)
}

pub(super) fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).context("failed to serialise command output")?;
    println!("{text}");
    Ok(())
}
