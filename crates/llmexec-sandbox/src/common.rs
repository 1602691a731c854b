//! Common utilities for running helper processes (pip, venv, the snippet itself)
//!
//! Every subprocess is bounded by a wall-clock timeout and has its output
//! captured.

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a child, in milliseconds
pub const WAIT_POLL_INTERVAL_MS: u64 = 50;

/// Captured result of a finished (or killed) child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, -1 when killed or terminated by a signal
    pub exit_code: i32,
    /// The child was killed because it exceeded its timeout
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Spawn `cmd` with piped stdout/stderr (stdin closed) and wait for it with a timeout.
///
/// On Unix the child leads its own process group, so anything it forks is
/// killed along with it.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<ProcessOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn()?;
    wait_with_timeout(&mut child, timeout)
}

/// Wait for child process with timeout
///
/// IMPORTANT: Reads stdout/stderr in background threads while the process runs.
/// Without this, a child writing large output (>64KB pipe buffer, e.g. pip
/// progress) would block on write, and we'd deadlock waiting for it to exit.
///
/// On timeout the child is killed and `timed_out` is set; whatever output was
/// produced before the kill is returned.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<ProcessOutput> {
    let start = Instant::now();
    let check_interval = Duration::from_millis(WAIT_POLL_INTERVAL_MS);

    let stdout_handle = child.stdout.take().map(|out| thread::spawn(move || read_lossy(out)));
    let stderr_handle = child.stderr.take().map(|err| thread::spawn(move || read_lossy(err)));

    let collect = |timed_out: bool, exit_code: i32| {
        let stdout = stdout_handle
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();
        let stderr = stderr_handle
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();
        ProcessOutput {
            stdout,
            stderr,
            exit_code,
            timed_out,
        }
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                // Leftover background children would hold the pipes open.
                kill_process_group(child);
                return Ok(collect(false, status.code().unwrap_or(-1)));
            }
            Ok(None) => {}
            Err(e) => {
                kill_process_group(child);
                let _ = child.kill();
                let _ = child.wait();
                let _ = collect(false, -1);
                return Err(e);
            }
        }

        if start.elapsed() > timeout {
            kill_process_group(child);
            let _ = child.kill();
            let _ = child.wait();
            return Ok(collect(true, -1));
        }

        thread::sleep(check_interval);
    }
}

/// SIGKILL every process in the group led by `child`. Only meaningful when
/// the child was spawned by [`run_with_timeout`].
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(pgid) = i32::try_from(child.id()) {
        // ESRCH: the group is already empty.
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn read_lossy(mut pipe: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_both_streams_and_exit_code() {
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.exit_code, 3);
        assert!(!out.timed_out);
        assert!(!out.success());
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done"]),
            Duration::from_secs(20),
        )
        .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.len(), 20000 * 11);
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "exec sleep 10"]),
            Duration::from_millis(300),
        )
        .unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_kills_grandchildren() {
        // The shell forks `sleep` instead of exec'ing it; the sleeper holds the pipes.
        let start = Instant::now();
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "sleep 8; echo done"]),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(out.timed_out);
        assert!(!out.stdout.contains("done"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_background_child_does_not_block_normal_exit() {
        let start = Instant::now();
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "sleep 8 & echo started"]),
            Duration::from_secs(20),
        )
        .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "started\n");
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
