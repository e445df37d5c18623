//! Child process plumbing shared by the managed services.

use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

/// RAII guard that kills a child process (and its process group on Unix)
/// on drop.
///
/// Armed for the whole readiness window of a service start: if the wait
/// errors out, dropping the guard reclaims the half-started process before
/// the error propagates. Call `disarm()` once the service handle takes
/// ownership.
pub(crate) struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    pub fn child_mut(&mut self) -> &mut Child {
        self.child.as_mut().expect("armed guard holds a child")
    }

    /// Hand the child over without killing it.
    pub fn disarm(mut self) -> Child {
        self.child.take().expect("armed guard holds a child")
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                unsafe {
                    if libc::killpg(pid as i32, libc::SIGKILL) == -1 {
                        let _ = child.start_kill();
                    }
                }
            }
            let _ = child.try_wait();
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
            let _ = child.try_wait();
        }
    }
}

/// Put the child in its own session (Unix only) so the whole process group
/// can be killed in one `killpg`, and make sure it dies with the harness.
#[cfg(unix)]
pub(crate) fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub(crate) fn set_new_session(_cmd: &mut Command) {}

/// Ask the child to stop (SIGTERM on Unix), wait up to `grace`, then kill.
pub(crate) async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            let _ = libc::kill(pid as i32, libc::SIGTERM);
        }
    }
    #[cfg(not(unix))]
    let _ = child.start_kill();

    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        debug!("process did not exit within {grace:?}, killing");
        let _ = child.kill().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;

    fn spawn_sleeper() -> Child {
        let mut cmd = Command::new("sleep");
        cmd.arg("30").stdout(Stdio::null()).kill_on_drop(true);
        set_new_session(&mut cmd);
        cmd.spawn().expect("spawn sleep")
    }

    #[tokio::test]
    async fn terminate_reaps_a_cooperative_process() {
        let mut child = spawn_sleeper();
        terminate(&mut child, Duration::from_secs(5)).await;
        // Either path reaps the child, so a follow-up wait is immediate.
        let status = child.wait().await.expect("wait");
        assert!(!status.success());
    }

    #[tokio::test]
    async fn terminate_force_kills_a_process_ignoring_sigterm() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("trap '' TERM; sleep 30")
            .stdout(Stdio::null())
            .kill_on_drop(true);
        set_new_session(&mut cmd);
        let mut child = cmd.spawn().expect("spawn");

        // Give the shell a moment to install the trap.
        tokio::time::sleep(Duration::from_millis(200)).await;
        terminate(&mut child, Duration::from_millis(300)).await;
        let status = child.wait().await.expect("wait");
        assert!(!status.success());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropping_an_armed_guard_kills_the_child() {
        let child = spawn_sleeper();
        let pid = child.id().expect("pid");
        drop(ChildGuard::new(child));

        // SIGKILL delivery is asynchronous; accept "gone" or "zombie".
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
                Err(_) => break,
                Ok(stat) if stat.contains(") Z ") => break,
                Ok(_) if std::time::Instant::now() > deadline => {
                    panic!("child survived guard drop")
                }
                Ok(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    }
}
