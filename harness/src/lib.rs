//! Functional-test harness for the vault daemon.
//!
//! Provisions an ephemeral regtest node and a vault daemon per test case,
//! isolates every attempt in its own numbered working directory, and
//! builds the layered spending-policy descriptors the daemon is
//! configured with. Orchestration is sequential per test; a bounded task
//! pool is available for tests that need concurrent client traffic.

pub mod attempts;
pub mod bitcoind;
pub mod config;
pub mod error;
pub mod fixture;
pub mod pool;
mod process;
pub mod rpc;
pub mod service;
pub mod signer;
pub mod vaultd;
pub mod workdir;

pub use attempts::AttemptRegistry;
pub use bitcoind::Bitcoind;
pub use config::{EXECUTOR_WORKERS, HarnessConfig};
pub use error::HarnessError;
pub use fixture::{Fixture, Session};
pub use pool::TaskPool;
pub use rpc::{RpcClient, RpcError};
pub use service::{Service, ServiceState};
pub use signer::{MultiSigner, SingleSigner};
pub use vaultd::Vaultd;
pub use workdir::{SessionDir, WorkDir};

/// Install the tracing subscriber for a test run. `RUST_LOG` filters;
/// defaults to `info`. Safe to call more than once.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
