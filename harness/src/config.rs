//! Harness configuration: where the service executables live.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::HarnessError;

/// Environment override naming the bitcoind executable to drive.
const BITCOIND_EXE_ENV: &str = "BITCOIND_EXE";

/// Environment override naming the vault daemon executable.
const VAULTD_EXE_ENV: &str = "VAULTD_EXE";

/// Worker threads in each test's task pool.
pub const EXECUTOR_WORKERS: usize = 20;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub bitcoind_exe: PathBuf,
    pub vaultd_exe: PathBuf,
}

impl HarnessConfig {
    /// Resolve both executables from their env overrides, falling back to
    /// a `$PATH` lookup.
    pub fn from_env() -> Result<Self, HarnessError> {
        Ok(Self {
            bitcoind_exe: resolve_exe(std::env::var_os(BITCOIND_EXE_ENV), "bitcoind")?,
            vaultd_exe: resolve_exe(std::env::var_os(VAULTD_EXE_ENV), "vaultd")?,
        })
    }
}

fn resolve_exe(env_override: Option<OsString>, program: &str) -> Result<PathBuf, HarnessError> {
    if let Some(path) = env_override {
        return Ok(PathBuf::from(path));
    }
    which::which(program).map_err(|source| HarnessError::MissingExecutable {
        program: program.to_string(),
        source,
    })
}
