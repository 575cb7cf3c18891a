//! Runs a problem through the engine and hydrates it with the results.

mod artifacts;
mod manifest;

pub use artifacts::{drive_dir_name, drive_indices, latest_artifact};
pub use manifest::{DriveManifest, MANIFEST_FILE, read_manifest, write_manifest};

use crate::domain::{DriveIntent, DriveResult, OommfcError, OommfcResult, Platform, Problem, RunOutput};
use crate::field::{Field, FieldFormat};
use crate::runner::{Runner, WorkingDirGuard, lock_working_dir};
use crate::scripts::serialization::write_text_artifact;
use crate::scripts::{LoweredScript, ScriptOptions, problem_script};
use crate::table::read_table;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-drive configuration that is not part of the problem.
#[derive(Debug, Clone)]
pub struct DriveOptions {
    pub dirname: PathBuf,
    pub append: bool,
    pub output_format: FieldFormat,
    pub fixed_subregions: Vec<String>,
    pub output_step: bool,
    pub compute: Option<String>,
    pub platform: Platform,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            dirname: PathBuf::from("."),
            append: true,
            output_format: FieldFormat::default(),
            fixed_subregions: Vec::new(),
            output_step: false,
            compute: None,
            platform: Platform::host(),
        }
    }
}

impl DriveOptions {
    pub fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            output_format: self.output_format,
            fixed_subregions: self.fixed_subregions.clone(),
            output_step: self.output_step,
            compute: self.compute.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriveOutcome {
    pub drive_index: usize,
    pub drive_dir: PathBuf,
    pub output: RunOutput,
}

/// `<dirname>/<name>` made absolute, so it survives the working-directory switch.
pub fn problem_dir(dirname: &Path, name: &str) -> OommfcResult<PathBuf> {
    let _lock = lock_working_dir();
    std::path::absolute(dirname.join(name)).map_err(|source| {
        OommfcError::from_io(
            "IO.PROBLEM_DIR",
            format!("failed to resolve {}", dirname.join(name).display()),
            &source,
        )
    })
}

fn next_drive_index(problem_dir: &Path, append: bool) -> DriveResult<usize> {
    let indices = drive_indices(problem_dir)?;
    match indices.last() {
        Some(_) if !append => Err(OommfcError::directory_exists(
            "RUN.DRIVE_EXISTS",
            format!(
                "{} already holds {} drive(s); pass append to add another",
                problem_dir.display(),
                indices.len()
            ),
        )),
        Some(last) => Ok(last + 1),
        None => Ok(0),
    }
}

/// Creates `run_dir` and writes the script and its sidecars into it.
pub(crate) fn prepare_run_dir(
    run_dir: &Path,
    name: &str,
    lowered: &LoweredScript,
) -> OommfcResult<PathBuf> {
    fs::create_dir_all(run_dir).map_err(|source| {
        OommfcError::from_io(
            "IO.DRIVE_DIR",
            format!("failed to create {}", run_dir.display()),
            &source,
        )
    })?;
    let script_path = run_dir.join(format!("{name}.mif"));
    write_text_artifact(&script_path, &lowered.script).map_err(|source| {
        OommfcError::from_io(
            "IO.SCRIPT_WRITE",
            format!("failed to write {}", script_path.display()),
            &source,
        )
    })?;
    lowered.write_sidecars(run_dir)?;
    Ok(script_path)
}

/// Calls the runner with the CWD held at `run_dir`.
pub(crate) fn invoke(runner: &dyn Runner, run_dir: &Path, script_path: &Path) -> OommfcResult<RunOutput> {
    let _guard = WorkingDirGuard::enter(run_dir)?;
    runner.call(script_path)
}

pub(crate) fn require_success(output: RunOutput, script_path: &Path) -> OommfcResult<RunOutput> {
    if output.is_success() {
        return Ok(output);
    }
    Err(OommfcError::engine_failure(
        "RUN.ENGINE_EXIT",
        format!(
            "engine exited with code {} running {}",
            output.returncode,
            script_path.display()
        ),
        output,
    ))
}

fn hydrate(problem: &mut Problem, drive_dir: &Path) -> OommfcResult<()> {
    let pattern = format!("{}-*.omf", problem.name);
    let snapshot = latest_artifact(drive_dir, &pattern)?.ok_or_else(|| {
        OommfcError::not_found(
            "RUN.MAGNETISATION_MISSING",
            format!(
                "engine wrote no magnetisation matching {pattern} in {}",
                drive_dir.display()
            ),
        )
    })?;
    debug!(snapshot = %snapshot.display(), "hydrating magnetisation");
    problem.m.assign_values(Field::read(&snapshot)?)?;
    problem.table = Some(read_table(
        &drive_dir.join(format!("{}.odt", problem.name)),
        true,
    )?);
    Ok(())
}

/// Lowers, runs and hydrates `problem` for one drive.
///
/// Artifacts of a failed run stay on disk and `problem.drive_number` is left unchanged.
pub fn drive(
    problem: &mut Problem,
    intent: &DriveIntent,
    runner: &dyn Runner,
    options: &DriveOptions,
) -> DriveResult<DriveOutcome> {
    let lowered = problem_script(problem, intent, &options.script_options(), options.platform)?;

    let problem_dir = problem_dir(&options.dirname, &problem.name)?;
    let index = next_drive_index(&problem_dir, options.append)?;
    let drive_dir = problem_dir.join(drive_dir_name(index));
    debug!(drive_dir = %drive_dir.display(), index, "selected drive directory");
    info!(
        problem = %problem.name,
        driver = intent.driver_class(),
        index,
        "starting drive"
    );

    let script_path = prepare_run_dir(&drive_dir, &problem.name, &lowered)?;
    let output = invoke(runner, &drive_dir, &script_path);

    let manifest = DriveManifest::new(index, intent.driver_class(), intent.manifest_args()?);
    if let Err(error) = write_manifest(&drive_dir, &manifest) {
        if output.is_ok() {
            return Err(error);
        }
        warn!(error = %error, "failed to write manifest for failed drive");
    }

    let output = require_success(output?, &script_path)?;
    hydrate(problem, &drive_dir)?;
    problem.drive_number += 1;

    info!(
        problem = %problem.name,
        index,
        drive_number = problem.drive_number,
        "drive finished"
    );
    Ok(DriveOutcome {
        drive_index: index,
        drive_dir,
        output,
    })
}
