use crate::domain::{OommfcError, OommfcResult};
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const DRIVE_PREFIX: &str = "drive-";

pub fn drive_dir_name(index: usize) -> String {
    format!("{DRIVE_PREFIX}{index}")
}

/// Indices of existing `drive-<k>` directories, ascending. A missing problem directory has none.
pub fn drive_indices(problem_dir: &Path) -> OommfcResult<Vec<usize>> {
    if !problem_dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(problem_dir).map_err(|source| {
        OommfcError::from_io(
            "IO.DRIVE_LIST",
            format!("failed to list {}", problem_dir.display()),
            &source,
        )
    })?;

    let mut indices = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            OommfcError::from_io(
                "IO.DRIVE_LIST",
                format!("failed to list {}", problem_dir.display()),
                &source,
            )
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let index = name
            .to_str()
            .and_then(|name| name.strip_prefix(DRIVE_PREFIX))
            .and_then(|index| index.parse::<usize>().ok());
        if let Some(index) = index {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

fn created_or_modified(path: &Path) -> Option<SystemTime> {
    let metadata = fs::metadata(path).ok()?;
    metadata.created().or_else(|_| metadata.modified()).ok()
}

/// Most recently created file in `dir` whose name matches `pattern`; ties go to the
/// lexicographically last name.
pub fn latest_artifact(dir: &Path, pattern: &str) -> OommfcResult<Option<PathBuf>> {
    let matcher = Glob::new(pattern)
        .map_err(|source| {
            OommfcError::internal(
                "RUN.ARTIFACT_PATTERN",
                format!("invalid artifact pattern '{pattern}': {source}"),
            )
        })?
        .compile_matcher();
    let entries = fs::read_dir(dir).map_err(|source| {
        OommfcError::from_io(
            "IO.ARTIFACT_LIST",
            format!("failed to list {}", dir.display()),
            &source,
        )
    })?;

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| matcher.is_match(Path::new(name)));
        if matches && path.is_file() {
            candidates.push((created_or_modified(&path), path));
        }
    }

    let latest = candidates
        .into_iter()
        .max_by(|(left_time, left), (right_time, right)| {
            left_time.cmp(right_time).then_with(|| left.cmp(right))
        })
        .map(|(_, path)| path);
    debug!(
        dir = %dir.display(),
        pattern,
        selected = ?latest.as_ref().map(|path| path.display().to_string()),
        "selected latest artifact"
    );
    Ok(latest)
}
