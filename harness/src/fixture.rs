//! The fixture chain every functional test runs through.
//!
//! Setup order: attempt number → working directory → node → funding →
//! descriptor → daemon → task pool. Teardown runs in reverse. Anything
//! already started when a later step fails is torn down before the error
//! propagates, so a broken setup never leaks processes.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::attempts::AttemptRegistry;
use crate::bitcoind::Bitcoind;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::pool::TaskPool;
use crate::service::Service;
use crate::vaultd::Vaultd;
use crate::workdir::{SessionDir, WorkDir};
use stockade_policy::{Descriptor, SpendingPolicy};

/// Balance the node must report before tests proceed (one mature coinbase).
const MIN_FUNDING_BALANCE: f64 = 50.0;

/// Session-wide state shared by every test: attempt counts, the base
/// directory, and whether anything has failed so far. Once a failure is
/// recorded, working directories are retained for inspection instead of
/// removed.
#[derive(Debug)]
pub struct Session {
    config: HarnessConfig,
    registry: AttemptRegistry,
    base_dir: SessionDir,
    failed: AtomicBool,
}

impl Session {
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        Ok(Self {
            config,
            registry: AttemptRegistry::new(),
            base_dir: SessionDir::create()?,
            failed: AtomicBool::new(false),
        })
    }

    /// Flag the session as failed; directories are retained from here on.
    pub fn record_failure(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn had_failures(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn base_dir(&self) -> &SessionDir {
        &self.base_dir
    }

    #[must_use]
    pub fn registry(&self) -> &AttemptRegistry {
        &self.registry
    }

    /// Bring up the full stack for one test.
    pub async fn setup(
        &self,
        test_name: &str,
        policy: &SpendingPolicy,
    ) -> Result<Fixture, HarnessError> {
        let workdir = WorkDir::allocate(&self.base_dir, &self.registry, test_name)?;
        info!("setting up '{test_name}' in {}", workdir.path().display());

        let mut bitcoind = Bitcoind::start(&self.config, workdir.path()).await?;
        if let Err(err) = bitcoind.fund(MIN_FUNDING_BALANCE).await {
            bitcoind.cleanup().await;
            return Err(err);
        }

        let descriptor = Descriptor::from_policy(policy);
        let vaultd =
            match Vaultd::start(&self.config, workdir.path(), &descriptor, &bitcoind).await {
                Ok(daemon) => daemon,
                Err(err) => {
                    bitcoind.cleanup().await;
                    return Err(err);
                }
            };
        let pool = TaskPool::new(test_name)?;

        Ok(Fixture {
            workdir,
            bitcoind,
            vaultd,
            pool,
            descriptor,
        })
    }

    /// Tear everything down in reverse setup order, then release the
    /// working directory under the session's failure policy.
    pub async fn teardown(&self, fixture: Fixture) -> Result<(), HarnessError> {
        let Fixture {
            workdir,
            mut bitcoind,
            mut vaultd,
            pool,
            descriptor: _,
        } = fixture;

        pool.shutdown();
        vaultd.cleanup().await;
        bitcoind.cleanup().await;
        workdir.release(self.had_failures())
    }

    /// Remove the session base directory if the tests left it empty.
    pub fn close(self) -> Result<(), HarnessError> {
        self.base_dir.close()
    }
}

/// Everything a test body needs, produced by [`Session::setup`].
#[derive(Debug)]
pub struct Fixture {
    pub workdir: WorkDir,
    pub bitcoind: Bitcoind,
    pub vaultd: Vaultd,
    pub pool: TaskPool,
    pub descriptor: Descriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_flag_is_sticky() {
        let base = tempfile::tempdir().expect("tempdir");
        let session = Session {
            config: HarnessConfig {
                bitcoind_exe: "bitcoind".into(),
                vaultd_exe: "vaultd".into(),
            },
            registry: AttemptRegistry::new(),
            base_dir: SessionDir::create_in(base.path()).expect("session dir"),
            failed: AtomicBool::new(false),
        };
        assert!(!session.had_failures());
        session.record_failure();
        session.record_failure();
        assert!(session.had_failures());
    }
}
