//! Derived quantities (energy, effective field, energy density) obtained from a
//! zero-length time drive that leaves the problem untouched.

use crate::domain::{
    DriveIntent, Evolver, EvolverKind, LoweringResult, OommfcError, OommfcResult, Platform,
    Problem, TimeEvolveIntent,
};
use crate::drive::{DriveOptions, invoke, latest_artifact, prepare_run_dir, problem_dir, require_success};
use crate::field::Field;
use crate::runner::Runner;
use crate::scripts::{LoweringContext, problem_script, term_script};
use crate::table::read_table;
use std::fs;
use tracing::{debug, info};

const COMPUTE_TIME: f64 = 1e-25;
const TOTAL_SOURCE: &str = "Oxs_RungeKuttaEvolve:evolver";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Energy,
    EffectiveField,
    EnergyDensity,
}

impl Quantity {
    const fn term_suffix(self) -> &'static str {
        match self {
            Self::Energy => "Energy",
            Self::EffectiveField => "Field",
            Self::EnergyDensity => "Energy density",
        }
    }

    const fn total_suffix(self) -> &'static str {
        match self {
            Self::Energy => "Total energy",
            Self::EffectiveField => "Total field",
            Self::EnergyDensity => "Total energy density",
        }
    }

    const fn artifact_pattern(self) -> Option<&'static str> {
        match self {
            Self::Energy => None,
            Self::EffectiveField => Some("*.ohf"),
            Self::EnergyDensity => Some("*.oef"),
        }
    }
}

/// Whole energy sum, or one term of it by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Total,
    Term(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputedValue {
    Scalar(f64),
    Field(Field),
}

/// Engine output name of `quantity` for `target`, e.g. `Oxs_Demag:demag:Energy`.
///
/// Terms are lowered as named instances, so their outputs carry the instance between the
/// class and the suffix rather than the bare `Class::suffix` form.
pub fn output_identifier(
    problem: &Problem,
    target: Target<'_>,
    quantity: Quantity,
    platform: Platform,
) -> LoweringResult<String> {
    let name = match target {
        Target::Total => return Ok(format!("{TOTAL_SOURCE}:{}", quantity.total_suffix())),
        Target::Term(name) => name,
    };
    let term = problem.energy.get(name).ok_or_else(|| {
        OommfcError::invalid_parameter(
            "INPUT.TERM_UNKNOWN",
            format!("problem '{}' has no energy term '{name}'", problem.name),
        )
    })?;

    let mut context = LoweringContext::new(problem.mesh(), platform);
    let fragment = term_script(&mut context, term)?;
    let label = fragment
        .lines()
        .filter_map(|line| line.strip_prefix("Specify "))
        .filter_map(|rest| rest.split_whitespace().next())
        .find(|label| {
            label
                .split_once(':')
                .is_some_and(|(_, instance)| instance == name)
        })
        .ok_or_else(|| {
            OommfcError::internal(
                "RUN.COMPUTE_IDENTIFIER",
                format!("term '{name}' lowered without a block of the same name"),
            )
        })?;
    Ok(format!("{label}:{}", quantity.term_suffix()))
}

/// Runs a single tiny time step and loads `quantity` for `target` from its outputs.
///
/// The run lives in a `compute-*` temporary directory under the problem directory and writes
/// no manifest; the problem's magnetisation and drive counter are not touched.
pub fn compute(
    problem: &Problem,
    target: Target<'_>,
    quantity: Quantity,
    runner: &dyn Runner,
    options: &DriveOptions,
) -> OommfcResult<ComputedValue> {
    let identifier = output_identifier(problem, target, quantity, options.platform)?;
    let mut script_options = options.script_options();
    script_options.compute = quantity
        .artifact_pattern()
        .map(|_| format!("Schedule \"{identifier}\" archive Step 1"));

    let intent = DriveIntent::TimeEvolve(TimeEvolveIntent {
        t: COMPUTE_TIME,
        n: 1,
        evolver: Some(Evolver::new(EvolverKind::RungeKutta)),
        stopping_dm_dt: None,
    });
    let lowered = problem_script(problem, &intent, &script_options, options.platform)?;

    let problem_dir = problem_dir(&options.dirname, &problem.name)?;
    fs::create_dir_all(&problem_dir).map_err(|source| {
        OommfcError::from_io(
            "IO.PROBLEM_DIR",
            format!("failed to create {}", problem_dir.display()),
            &source,
        )
    })?;
    let run_dir = tempfile::Builder::new()
        .prefix("compute-")
        .tempdir_in(&problem_dir)
        .map_err(|source| {
            OommfcError::from_io(
                "IO.COMPUTE_DIR",
                format!("failed to create compute directory in {}", problem_dir.display()),
                &source,
            )
        })?;
    info!(problem = %problem.name, identifier = %identifier, "computing derived quantity");

    let script_path = prepare_run_dir(run_dir.path(), &problem.name, &lowered)?;
    require_success(invoke(runner, run_dir.path(), &script_path)?, &script_path)?;

    let value = match quantity.artifact_pattern() {
        None => {
            let table = read_table(&run_dir.path().join(format!("{}.odt", problem.name)), false)?;
            let value = table.last_value(&identifier).ok_or_else(|| {
                OommfcError::not_found(
                    "RUN.COMPUTE_COLUMN",
                    format!("engine table has no column '{identifier}'"),
                )
            })?;
            ComputedValue::Scalar(value)
        }
        Some(pattern) => {
            let path = latest_artifact(run_dir.path(), pattern)?.ok_or_else(|| {
                OommfcError::not_found(
                    "RUN.COMPUTE_ARTIFACT",
                    format!("engine wrote no {pattern} output for '{identifier}'"),
                )
            })?;
            debug!(path = %path.display(), "loading computed field");
            ComputedValue::Field(Field::read(&path)?)
        }
    };
    Ok(value)
}
