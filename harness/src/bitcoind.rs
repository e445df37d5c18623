//! The regtest node: spawn, wait for RPC, fund the watch wallet.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::process::{ChildGuard, set_new_session, terminate};
use crate::rpc::{RpcClient, RpcError};
use crate::service::{
    POLL_INTERVAL, SHUTDOWN_GRACE, STARTUP_TIMEOUT, Service, ServiceState, wait_until_ready,
};

/// Blocks mined while funding. Exceeds the coinbase maturity window so the
/// first rewards are spendable once the wait below clears.
const FUNDING_BLOCKS: u32 = 101;

/// Upper bound on the post-mining balance wait. The original behavior was
/// to wait forever; a wedged node now fails the test instead of hanging it.
const FUNDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Name of the node-side wallet the harness mines to.
const WALLET_NAME: &str = "stockade";

/// Handle on a running regtest bitcoind.
#[derive(Debug)]
pub struct Bitcoind {
    child: Option<Child>,
    state: ServiceState,
    rpc: RpcClient,
    bitcoin_dir: PathBuf,
    rpc_port: u16,
}

impl Bitcoind {
    /// Launch bitcoind under `workdir` and block until its RPC interface
    /// answers. The spawned process is killed if readiness never arrives.
    pub async fn start(config: &HarnessConfig, workdir: &Path) -> Result<Self, HarnessError> {
        let bitcoin_dir = workdir.join("bitcoind");
        std::fs::create_dir_all(&bitcoin_dir)?;
        let rpc_port = free_port()?;

        let mut cmd = Command::new(&config.bitcoind_exe);
        cmd.arg("-regtest")
            .arg(format!("-datadir={}", bitcoin_dir.display()))
            .arg(format!("-rpcport={rpc_port}"))
            .arg("-listen=0")
            .arg("-fallbackfee=0.00001")
            .arg("-server=1")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        set_new_session(&mut cmd);

        debug!("starting bitcoind, rpc port {rpc_port}");
        let mut guard = ChildGuard::new(cmd.spawn()?);
        let rpc = RpcClient::new(rpc_port, cookie_path_in(&bitcoin_dir));

        wait_until_ready("bitcoind", STARTUP_TIMEOUT, POLL_INTERVAL, async || {
            if let Some(status) = guard.child_mut().try_wait()? {
                return Err(HarnessError::EarlyExit {
                    service: "bitcoind",
                    status,
                });
            }
            // Cookie not written yet / RPC warming up both read as not-ready.
            Ok(rpc.call("getblockchaininfo", json!([])).await.is_ok())
        })
        .await?;

        info!("bitcoind ready on rpc port {rpc_port}");
        Ok(Self {
            child: Some(guard.disarm()),
            state: ServiceState::Ready,
            rpc,
            bitcoin_dir,
            rpc_port,
        })
    }

    #[must_use]
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    #[must_use]
    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    #[must_use]
    pub fn bitcoin_dir(&self) -> &Path {
        &self.bitcoin_dir
    }

    /// The cookie credential the daemon authenticates with.
    #[must_use]
    pub fn cookie_path(&self) -> PathBuf {
        cookie_path_in(&self.bitcoin_dir)
    }

    /// Create the watch wallet, mine the initial chain, and wait until the
    /// node reports at least `min_balance`.
    pub async fn fund(&self, min_balance: f64) -> Result<(), HarnessError> {
        fund_wallet(&self.rpc, min_balance).await
    }

    pub async fn balance(&self) -> Result<f64, HarnessError> {
        get_balance(&self.rpc).await
    }
}

impl Service for Bitcoind {
    fn name(&self) -> &'static str {
        "bitcoind"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    async fn cleanup(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        debug!("stopping bitcoind");
        terminate(&mut child, SHUTDOWN_GRACE).await;
        self.state = ServiceState::Stopped;
    }
}

/// Mine `FUNDING_BLOCKS` to a fresh address and poll the node's balance
/// until it clears `min_balance`.
pub async fn fund_wallet(rpc: &RpcClient, min_balance: f64) -> Result<(), HarnessError> {
    rpc.call(
        "createwallet",
        json!([WALLET_NAME, false, false, "", false, true, true]),
    )
    .await?;
    let address = rpc
        .call("getnewaddress", json!([]))
        .await?
        .as_str()
        .ok_or(RpcError::MalformedResponse("getnewaddress: not a string"))?
        .to_string();
    rpc.call("generatetoaddress", json!([FUNDING_BLOCKS, address]))
        .await?;
    wait_for_balance(rpc, min_balance, FUNDING_TIMEOUT).await
}

/// Poll `getbalance` at a fixed interval until it reaches `min_balance`.
///
/// The balance only becomes visible once the node has indexed the mined
/// blocks, and there is no notification to subscribe to.
pub async fn wait_for_balance(
    rpc: &RpcClient,
    min_balance: f64,
    timeout: Duration,
) -> Result<(), HarnessError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let balance = get_balance(rpc).await?;
        if balance >= min_balance {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(HarnessError::SyncTimeout {
                min_balance,
                timeout,
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn get_balance(rpc: &RpcClient) -> Result<f64, HarnessError> {
    rpc.call("getbalance", json!([]))
        .await?
        .as_f64()
        .ok_or_else(|| RpcError::MalformedResponse("getbalance: not a number").into())
}

fn cookie_path_in(bitcoin_dir: &Path) -> PathBuf {
    bitcoin_dir.join("regtest").join(".cookie")
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}
