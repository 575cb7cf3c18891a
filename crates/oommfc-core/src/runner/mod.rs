//! The seam between the drive orchestration and the engine process.

mod workdir;

pub use crate::domain::RunOutput;
pub use workdir::{WorkingDirGuard, lock_working_dir};

use crate::domain::{OommfcError, OommfcResult};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Executes a lowered script. Called with the process CWD set to the drive directory.
pub trait Runner {
    fn call(&self, script_path: &Path) -> OommfcResult<RunOutput>;

    /// Stops a running engine. Runners without a process to stop do nothing.
    fn kill(&self) -> OommfcResult<()> {
        Ok(())
    }
}

/// Runs `<program> <args...> <script>` as a child process and captures its streams.
#[derive(Debug)]
pub struct CommandRunner {
    program: PathBuf,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CommandRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: Mutex::new(None),
        }
    }

    /// Splits a command line such as `tclsh /opt/oommf/oommf.tcl boxsi` on whitespace.
    pub fn from_command_line(command: &str) -> OommfcResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            OommfcError::invalid_parameter("INPUT.ENGINE_COMMAND", "engine command is empty")
        })?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

fn drain(mut stream: impl Read + Send + 'static) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = stream.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

impl Runner for CommandRunner {
    fn call(&self, script_path: &Path) -> OommfcResult<RunOutput> {
        info!(
            program = %self.program.display(),
            script = %script_path.display(),
            "invoking engine"
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(script_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                OommfcError::from_io(
                    "IO.ENGINE_SPAWN",
                    format!("failed to start engine '{}'", self.program.display()),
                    &source,
                )
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        *self.child.lock().unwrap_or_else(PoisonError::into_inner) = Some(child);

        let status = loop {
            let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(child) = slot.as_mut() else {
                return Err(OommfcError::internal(
                    "RUN.ENGINE_HANDLE",
                    "engine process handle disappeared while waiting",
                ));
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    slot.take();
                    break status;
                }
                Ok(None) => {}
                Err(source) => {
                    slot.take();
                    return Err(OommfcError::from_io(
                        "IO.ENGINE_WAIT",
                        "failed to wait for engine",
                        &source,
                    ));
                }
            }
            drop(slot);
            thread::sleep(POLL_INTERVAL);
        };

        let output = RunOutput {
            returncode: status.code().unwrap_or(-1),
            stdout: stdout.and_then(|handle| handle.join().ok()),
            stderr: stderr.and_then(|handle| handle.join().ok()),
        };
        debug!(returncode = output.returncode, "engine exited");
        Ok(output)
    }

    fn kill(&self) -> OommfcResult<()> {
        let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(child) = slot.as_mut() {
            info!(pid = child.id(), "killing engine");
            child
                .kill()
                .map_err(|source| OommfcError::from_io("IO.ENGINE_KILL", "failed to kill engine", &source))?;
        }
        Ok(())
    }
}
