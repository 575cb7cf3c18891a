mod commands;
mod helpers;

use clap::Parser;
use oommfc_core::domain::OommfcError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_oommfc_error();
            eprintln!("{}", error.diagnostic_line());
            if let Some(output) = error.engine_output() {
                if let Some(stderr) = output.stderr.as_deref().filter(|text| !text.is_empty()) {
                    eprintln!("{}", stderr.trim_end());
                }
            }
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("oommfc-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when `run` is called more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(name = "oommfc-rs", version, about = "Lower, run and inspect OOMMF micromagnetic problems")]
struct Cli {
    /// Log lowering and drive progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Print the MIF script for a problem document
    Script(commands::ScriptArgs),
    /// Drive a problem document through the engine
    Drive(commands::DriveArgs),
    /// Parse an ODT table and print it as JSON
    Table(commands::TableArgs),
    /// Delete a problem directory
    Delete(commands::DeleteArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Script(args) => commands::run_script_command(args),
        CliCommand::Drive(args) => commands::run_drive_command(args),
        CliCommand::Table(args) => commands::run_table_command(args),
        CliCommand::Delete(args) => commands::run_delete_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(OommfcError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<OommfcError> for CliError {
    fn from(error: OommfcError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_oommfc_error(&self) -> OommfcError {
        match self {
            Self::Usage(message) => OommfcError::invalid_parameter("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => OommfcError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
