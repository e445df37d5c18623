//! The wallet daemon under test: config generation, spawn, readiness.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::bitcoind::Bitcoind;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::process::{ChildGuard, set_new_session, terminate};
use crate::service::{
    POLL_INTERVAL, SHUTDOWN_GRACE, STARTUP_TIMEOUT, Service, ServiceState, wait_until_ready,
};
use stockade_policy::Descriptor;

/// On-disk configuration handed to the daemon via `--conf`.
#[derive(Debug, Serialize)]
struct DaemonConfig<'a> {
    data_dir: &'a Path,
    daemon: bool,
    log_level: &'a str,
    main_descriptor: &'a str,
    bitcoind_config: BitcoindConfig<'a>,
}

#[derive(Debug, Serialize)]
struct BitcoindConfig<'a> {
    cookie_path: &'a Path,
    addr: String,
}

/// Handle on a running vault daemon.
#[derive(Debug)]
pub struct Vaultd {
    child: Option<Child>,
    state: ServiceState,
    data_dir: PathBuf,
    socket_path: PathBuf,
}

impl Vaultd {
    /// Write the daemon's config under `workdir` and start it against
    /// `node`. Readiness is the control socket appearing; the spawned
    /// process is killed if it never does.
    pub async fn start(
        config: &HarnessConfig,
        workdir: &Path,
        descriptor: &Descriptor,
        node: &Bitcoind,
    ) -> Result<Self, HarnessError> {
        let data_dir = workdir.join("vaultd");
        std::fs::create_dir_all(&data_dir)?;

        let cookie_path = node.cookie_path();
        let conf = DaemonConfig {
            data_dir: &data_dir,
            daemon: false,
            log_level: "debug",
            main_descriptor: descriptor.as_str(),
            bitcoind_config: BitcoindConfig {
                cookie_path: &cookie_path,
                addr: format!("127.0.0.1:{}", node.rpc_port()),
            },
        };
        let conf_path = data_dir.join("daemon.toml");
        std::fs::write(&conf_path, toml::to_string(&conf)?)?;

        // Keep the daemon's output next to its data: workdirs are retained
        // on failure, so this is what gets read during a postmortem.
        let log = File::create(data_dir.join("stdout.log"))?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(&config.vaultd_exe);
        cmd.arg("--conf")
            .arg(&conf_path)
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true);
        set_new_session(&mut cmd);

        debug!("starting vaultd with descriptor {descriptor}");
        let mut guard = ChildGuard::new(cmd.spawn()?);
        let socket_path = data_dir.join("regtest").join("vaultd_rpc");

        wait_until_ready("vaultd", STARTUP_TIMEOUT, POLL_INTERVAL, async || {
            if let Some(status) = guard.child_mut().try_wait()? {
                return Err(HarnessError::EarlyExit {
                    service: "vaultd",
                    status,
                });
            }
            Ok(socket_path.exists())
        })
        .await?;

        info!("vaultd ready, socket {}", socket_path.display());
        Ok(Self {
            child: Some(guard.disarm()),
            state: ServiceState::Ready,
            data_dir,
            socket_path,
        })
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The control socket tests talk to.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Service for Vaultd {
    fn name(&self) -> &'static str {
        "vaultd"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    async fn cleanup(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        debug!("stopping vaultd");
        terminate(&mut child, SHUTDOWN_GRACE).await;
        self.state = ServiceState::Stopped;
    }
}
