use super::CliError;
use super::helpers::{engine_runner, print_json, read_document};
use oommfc_core::cleanup::delete_problem_dir;
use oommfc_core::domain::Platform;
use oommfc_core::drive::{DriveOptions, drive};
use oommfc_core::field::FieldFormat;
use oommfc_core::scripts::{ScriptOptions, problem_script};
use oommfc_core::table::read_table;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct ScriptArgs {
    /// Problem document (JSON)
    problem: PathBuf,

    /// Field output format requested from the engine
    #[arg(long, default_value = "binary8")]
    format: FieldFormat,

    /// Target platform for extension selection (defaults to the host)
    #[arg(long, value_parser = ["unix", "windows"])]
    platform: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct DriveArgs {
    /// Problem document (JSON)
    problem: PathBuf,

    /// Directory holding problem directories
    #[arg(long, default_value = ".")]
    dirname: PathBuf,

    /// Fail instead of adding a drive when drives already exist
    #[arg(long)]
    no_append: bool,

    /// Field output format requested from the engine
    #[arg(long, default_value = "binary8")]
    format: FieldFormat,

    /// Subregions whose spins stay fixed
    #[arg(long = "fixed", value_delimiter = ',')]
    fixed_subregions: Vec<String>,

    /// Write a table row every step of a time drive
    #[arg(long)]
    output_step: bool,

    /// Engine command line, e.g. "tclsh /opt/oommf/oommf.tcl boxsi" (falls back to $OOMMF_COMMAND)
    #[arg(long)]
    engine: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct TableArgs {
    /// ODT table file
    file: PathBuf,

    /// Keep the engine's column names
    #[arg(long)]
    raw: bool,
}

#[derive(clap::Args)]
pub(super) struct DeleteArgs {
    /// Problem name
    name: String,

    /// Directory holding problem directories
    #[arg(long, default_value = ".")]
    dirname: PathBuf,

    /// Succeed when the directory does not exist
    #[arg(long)]
    silent: bool,
}

#[derive(Debug, Serialize)]
struct DriveSummary {
    drive_number: usize,
    drive_dir: PathBuf,
    columns: Vec<String>,
    row_count: usize,
}

fn platform(name: Option<&str>) -> Platform {
    match name {
        Some("windows") => Platform::Windows,
        Some(_) => Platform::Unix,
        None => Platform::host(),
    }
}

pub(super) fn run_script_command(args: ScriptArgs) -> Result<i32, CliError> {
    let (problem, intent) = read_document(&args.problem)?;
    let options = ScriptOptions {
        output_format: args.format,
        ..ScriptOptions::default()
    };
    let lowered = problem_script(&problem, &intent, &options, platform(args.platform.as_deref()))?;
    print!("{}", lowered.script);
    Ok(0)
}

pub(super) fn run_drive_command(args: DriveArgs) -> Result<i32, CliError> {
    let (mut problem, intent) = read_document(&args.problem)?;
    let runner = engine_runner(args.engine)?;
    let options = DriveOptions {
        dirname: args.dirname,
        append: !args.no_append,
        output_format: args.format,
        fixed_subregions: args.fixed_subregions,
        output_step: args.output_step,
        ..DriveOptions::default()
    };

    let outcome = drive(&mut problem, &intent, &runner, &options)?;
    info!(drive_dir = %outcome.drive_dir.display(), "drive complete");
    let (columns, row_count) = problem
        .table
        .as_ref()
        .map(|table| (table.columns.clone(), table.row_count()))
        .unwrap_or_default();
    print_json(&DriveSummary {
        drive_number: problem.drive_number,
        drive_dir: outcome.drive_dir,
        columns,
        row_count,
    })?;
    Ok(0)
}

pub(super) fn run_table_command(args: TableArgs) -> Result<i32, CliError> {
    let table = read_table(&args.file, !args.raw)?;
    print_json(&table)?;
    Ok(0)
}

pub(super) fn run_delete_command(args: DeleteArgs) -> Result<i32, CliError> {
    delete_problem_dir(&args.dirname, &args.name, args.silent)?;
    Ok(0)
}
