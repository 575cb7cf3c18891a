use crate::domain::{OommfcError, OommfcResult};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Serialises code that reads or changes the process working directory.
pub fn lock_working_dir() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the process CWD at a directory and restores the previous one on drop.
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl WorkingDirGuard {
    pub fn enter(path: &Path) -> OommfcResult<Self> {
        let lock = lock_working_dir();
        let previous = env::current_dir().map_err(|source| {
            OommfcError::from_io("IO.CURRENT_DIR", "failed to read current working directory", &source)
        })?;
        env::set_current_dir(path).map_err(|source| {
            OommfcError::from_io(
                "IO.CHANGE_DIR",
                format!("failed to enter {}", path.display()),
                &source,
            )
        })?;
        debug!(path = %path.display(), "entered working directory");
        Ok(Self {
            previous,
            _lock: lock,
        })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(source) = env::set_current_dir(&self.previous) {
            warn!(
                path = %self.previous.display(),
                error = %source,
                "failed to restore working directory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkingDirGuard;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn guard_restores_directory_on_early_return() {
        let temp = TempDir::new().expect("tempdir should be created");
        let target = temp
            .path()
            .canonicalize()
            .expect("tempdir should canonicalise");

        let before = {
            let _lock = super::lock_working_dir();
            env::current_dir().expect("cwd should be readable")
        };

        let failing = || -> Result<(), String> {
            let _guard = WorkingDirGuard::enter(&target).map_err(|error| error.to_string())?;
            let inside = env::current_dir().map_err(|error| error.to_string())?;
            assert_eq!(inside.canonicalize().ok(), Some(target.clone()));
            Err("engine failed".to_string())
        };
        assert!(failing().is_err());

        let _lock = super::lock_working_dir();
        assert_eq!(env::current_dir().expect("cwd should be readable"), before);
    }

    #[test]
    fn entering_missing_directory_fails_without_moving() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = WorkingDirGuard::enter(&temp.path().join("missing"))
            .expect_err("missing directory should fail");
        assert_eq!(error.placeholder(), "IO.CHANGE_DIR");
    }
}
