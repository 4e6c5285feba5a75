use serde::Serialize;
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Everything a finished command produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl From<Output> for ExecutionOutcome {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }
    }
}

/// Reasons a command produced no outcome at all.
/// A non-zero exit is not one of them.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start command: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to collect command output: {0}")]
    Wait(#[source] io::Error),

    #[error("command timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("command waiter exited unexpectedly")]
    WaiterLost,
}

/// Run a command to completion or until `timeout` elapses.
///
/// The child gets a null stdin, piped stdout/stderr and (on unix) its own
/// process group. The deadline covers both the exit and draining the pipes,
/// so a backgrounded job holding stdout open also counts as a timeout. On
/// timeout the whole group is killed and the child reaped before returning.
pub fn run_command(mut cmd: Command, timeout: Duration) -> Result<ExecutionOutcome, ExecError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
    let child_id = child.id();
    let deadline = Instant::now() + timeout;

    let stdout_rx = spawn_reader(child.stdout.take());
    let stderr_rx = spawn_reader(child.stderr.take());

    let (tx, rx) = mpsc::channel();
    let waiter = thread::spawn(move || {
        let _ = tx.send(child.wait());
    });

    let status = match rx.recv_timeout(timeout) {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            let _ = waiter.join();
            return Err(ExecError::Wait(e));
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            kill_process_group(child_id, true);
            let _ = waiter.join();
            return Err(ExecError::Timeout(timeout));
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => return Err(ExecError::WaiterLost),
    };
    let _ = waiter.join();

    let stdout = drain(&stdout_rx, child_id, deadline, timeout)?;
    let stderr = drain(&stderr_rx, child_id, deadline, timeout)?;

    Ok(Output {
        status,
        stdout,
        stderr,
    }
    .into())
}

/// Read a pipe to EOF on its own thread.
///
/// A process that left the group (e.g. via `setsid`) can keep the pipe open
/// past a kill; its reader then lingers until that process exits, but the
/// caller never waits on it beyond the deadline.
fn spawn_reader<R>(pipe: Option<R>) -> mpsc::Receiver<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send(result);
    });
    rx
}

/// Collect a reader's bytes, killing the group if the deadline passes first
fn drain(
    rx: &mpsc::Receiver<io::Result<Vec<u8>>>,
    pgid: u32,
    deadline: Instant,
    timeout: Duration,
) -> Result<Vec<u8>, ExecError> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(ExecError::Wait(e)),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            kill_process_group(pgid, false);
            Err(ExecError::Timeout(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ExecError::WaiterLost),
    }
}

/// Kill the process group led by `pid`.
///
/// `unreaped_leader` also signals `pid` directly, in case the leader itself
/// left the group. Only valid while the waiter still blocks on it, otherwise
/// the pid may already belong to an unrelated process.
#[cfg(unix)]
fn kill_process_group(pid: u32, unreaped_leader: bool) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(pid as i32);
    match killpg(pid, Signal::SIGKILL) {
        Ok(()) => tracing::debug!(pgid = %pid, "killed timed out process group"),
        Err(nix::Error::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = %pid, error = %e, "failed to kill process group"),
    }
    if unreaped_leader {
        let _ = kill(pid, Signal::SIGKILL);
    }
}

#[cfg(windows)]
fn kill_process_group(pid: u32, unreaped_leader: bool) {
    // Windows has no group to address once the leader is gone
    if !unreaped_leader {
        return;
    }
    let _ = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .output();
}
