use crate::domain::{OommfcError, OommfcResult, Problem, validate_problem_name};
use crate::drive::problem_dir;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

/// Removes `<dirname>/<name>` recursively.
///
/// Read-only files left behind by the engine are made writable and removal is retried once.
pub fn delete_problem_dir(dirname: &Path, name: &str, silent: bool) -> OommfcResult<()> {
    validate_problem_name(name)?;
    let path = problem_dir(dirname, name)?;
    if !path.exists() {
        if silent {
            return Ok(());
        }
        return Err(OommfcError::not_found(
            "IO.PROBLEM_DIR_MISSING",
            format!("problem directory {} does not exist", path.display()),
        ));
    }

    let removal = match fs::remove_dir_all(&path) {
        Err(source) if source.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                path = %path.display(),
                error = %source,
                "removal denied; retrying after clearing read-only flags"
            );
            make_writable(&path).and_then(|()| fs::remove_dir_all(&path))
        }
        other => other,
    };
    removal.map_err(|source| {
        OommfcError::from_io(
            "IO.PROBLEM_DIR_DELETE",
            format!("failed to delete {}", path.display()),
            &source,
        )
    })?;
    info!(path = %path.display(), "deleted problem directory");
    Ok(())
}

/// Removes the problem's directory and resets its drive counter.
pub fn delete(problem: &mut Problem, dirname: &Path, silent: bool) -> OommfcResult<()> {
    delete_problem_dir(dirname, &problem.name, silent)?;
    problem.drive_number = 0;
    Ok(())
}
