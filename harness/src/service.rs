//! Generic service lifecycle: start, wait for readiness, clean up.
//!
//! Both managed services follow the same contract. `start` spawns the
//! process and blocks until a readiness probe passes or the startup
//! timeout elapses; the spawned child is guarded so every error exit path
//! kills whatever was partially started before the error propagates.
//! `cleanup` requests a graceful stop, waits a bounded grace period, then
//! force-kills; calling it on an already-stopped handle is a no-op.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::HarnessError;

/// How long a service gets to come up before startup fails.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period between the stop request and the force-kill.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Fixed interval between readiness and balance probes. The collaborators
/// expose no push notifications, so polling it is.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle states of a managed service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Starting,
    Ready,
    Failed,
    Stopped,
}

/// A managed external process the fixture can tear down.
#[allow(async_fn_in_trait)]
pub trait Service {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    fn state(&self) -> ServiceState;

    /// Graceful stop, bounded wait, then force-kill. Idempotent.
    async fn cleanup(&mut self);
}

/// Poll `probe` at `interval` until it reports readiness or `timeout`
/// elapses. Probe errors abort the wait; a probe that merely isn't ready
/// yet returns `Ok(false)` and keeps the loop going.
pub async fn wait_until_ready(
    service: &'static str,
    timeout: Duration,
    interval: Duration,
    mut probe: impl AsyncFnMut() -> Result<bool, HarnessError>,
) -> Result<(), HarnessError> {
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(HarnessError::StartupTimeout { service, timeout });
        }
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_once_the_probe_passes() {
        let mut polls = 0;
        wait_until_ready(
            "probe",
            Duration::from_secs(5),
            Duration::from_millis(1),
            async || {
                polls += 1;
                Ok(polls >= 3)
            },
        )
        .await
        .expect("ready");
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn times_out_when_the_probe_never_passes() {
        let result = wait_until_ready(
            "stuck",
            Duration::from_millis(50),
            Duration::from_millis(5),
            async || Ok(false),
        )
        .await;
        assert!(matches!(
            result,
            Err(HarnessError::StartupTimeout { service: "stuck", .. })
        ));
    }

    #[tokio::test]
    async fn probe_errors_abort_the_wait() {
        let result = wait_until_ready(
            "broken",
            Duration::from_secs(5),
            Duration::from_millis(1),
            async || {
                Err(HarnessError::Io(std::io::Error::other("probe exploded")))
            },
        )
        .await;
        assert!(matches!(result, Err(HarnessError::Io(_))));
    }

    struct FakeService {
        state: ServiceState,
        cleanups: usize,
    }

    impl Service for FakeService {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn state(&self) -> ServiceState {
            self.state
        }

        async fn cleanup(&mut self) {
            if self.state == ServiceState::Stopped {
                return;
            }
            self.cleanups += 1;
            self.state = ServiceState::Stopped;
        }
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let mut service = FakeService {
            state: ServiceState::Ready,
            cleanups: 0,
        };
        service.cleanup().await;
        service.cleanup().await;
        assert_eq!(service.cleanups, 1);
        assert_eq!(service.state(), ServiceState::Stopped);
    }
}
