//! Failure taxonomy for the harness.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use crate::rpc::RpcError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A service was started but never signalled readiness.
    #[error("{service} did not become ready within {timeout:?}")]
    StartupTimeout {
        service: &'static str,
        timeout: Duration,
    },
    /// A service process died while we were still waiting for readiness.
    #[error("{service} exited during startup ({status})")]
    EarlyExit {
        service: &'static str,
        status: ExitStatus,
    },
    /// The node never reported the expected balance after mining.
    #[error("node balance did not reach {min_balance} within {timeout:?}")]
    SyncTimeout { min_balance: f64, timeout: Duration },
    /// A working directory could not be fully removed at teardown. Loud on
    /// purpose: silent partial cleanup hides resource leaks.
    #[error("could not remove working directory {dir} ({source}); remaining files: {remaining:?}")]
    ResourceLeak {
        dir: PathBuf,
        remaining: Vec<PathBuf>,
        source: std::io::Error,
    },
    #[error("{program} not found in PATH")]
    MissingExecutable {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("could not render daemon config: {0}")]
    DaemonConfig(#[from] toml::ser::Error),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Policy(#[from] stockade_policy::PolicyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
