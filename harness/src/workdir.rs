//! Session and per-attempt working directories.
//!
//! Every test attempt gets `<session>/<test_id>_<attempt>` under a
//! session-scoped base directory. Clean sessions remove their directories
//! at teardown; once anything has failed, directories are retained for
//! postmortem inspection and their paths reported.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::attempts::AttemptRegistry;
use crate::error::HarnessError;

/// Environment override for where the session directory is created.
const BASE_DIR_ENV: &str = "TEST_DIR";

/// Session-scoped base directory holding every test's working directories.
#[derive(Debug)]
pub struct SessionDir {
    path: PathBuf,
}

impl SessionDir {
    /// Create the base directory under `$TEST_DIR`, falling back to the
    /// system temp dir.
    pub fn create() -> Result<Self, HarnessError> {
        let base = std::env::var_os(BASE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self::create_in(&base)
    }

    pub fn create_in(base: &Path) -> Result<Self, HarnessError> {
        let dir = tempfile::Builder::new()
            .prefix("stockade-tests-")
            .tempdir_in(base)?;
        let path = dir.into_path();
        info!("running tests in {}", path.display());
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the base directory if the tests left nothing behind;
    /// otherwise leave it in place and report what remains.
    pub fn close(self) -> Result<(), HarnessError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            entries.push(entry?.file_name().to_string_lossy().into_owned());
        }
        if entries.is_empty() {
            fs::remove_dir(&self.path)?;
        } else {
            warn!(
                "leaving base dir '{}' as it still contains {entries:?}",
                self.path.display()
            );
        }
        Ok(())
    }
}

/// A working directory scoped to exactly one test attempt.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Allocate the next attempt's directory for `test_id`.
    pub fn allocate(
        session: &SessionDir,
        registry: &AttemptRegistry,
        test_id: &str,
    ) -> Result<Self, HarnessError> {
        let attempt = registry.next_attempt(test_id);
        Self::at(session.path(), test_id, attempt)
    }

    /// Create `base/{test_id}_{attempt}`. Idempotent: a directory left over
    /// from a non-conflicting partial prior run is fine.
    pub fn at(base: &Path, test_id: &str, attempt: u32) -> Result<Self, HarnessError> {
        let path = base.join(format!("{test_id}_{attempt}"));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory on a clean session; retain it (and say so) once
    /// anything has failed. A failed removal enumerates what is left and
    /// propagates — silent partial cleanup is worse than a loud leak.
    pub fn release(self, session_had_failures: bool) -> Result<(), HarnessError> {
        if session_had_failures {
            warn!(
                "test failed, leaving directory '{}' intact",
                self.path.display()
            );
            return Ok(());
        }
        if let Err(source) = fs::remove_dir_all(&self.path) {
            let remaining = remaining_files(&self.path);
            return Err(HarnessError::ResourceLeak {
                dir: self.path,
                remaining,
                source,
            });
        }
        Ok(())
    }
}

fn remaining_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(remaining_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}
