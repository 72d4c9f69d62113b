//! Command execution for resource-manager tools.
//!
//! Runs a program with an argument list (no shell), captures stdout and
//! stderr, and reports the exit code without interpreting it. A non-zero
//! exit is not an error here; only a failure to start the program is.

use crate::error::{Result, TrackNodesError};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default watchdog for resource-manager commands
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Captured result of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Stdout as lossy UTF-8
    pub stdout: String,
    /// Stderr as lossy UTF-8 (kept for diagnostics, never parsed)
    pub stderr: String,
    /// Exit code, None if killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// First line of stdout, if any
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().next()
    }
}

/// Something that can run an external command and capture its output.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Runs commands on the local system, optionally bounded by a timeout.
///
/// The timeout covers the whole invocation: waiting for the program and
/// draining its pipes. Each command runs in its own process group so that
/// background children left behind by wrapper scripts are killed with it.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
    }
}

impl SystemCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput> {
        let cmd_line = display_command(program, args);
        debug!("Running {} (timeout {:?})", cmd_line, self.timeout);

        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| TrackNodesError::Subprocess {
                command: cmd_line.clone(),
                source,
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let status = wait_child(&mut child, deadline, &cmd_line, self.timeout)?;

        // A descendant can keep the pipes open after the child exits
        let (Some(stdout), Some(stderr)) = (
            drain(stdout_reader, deadline),
            drain(stderr_reader, deadline),
        ) else {
            kill_process_group(&child);
            return Err(timed_out(&cmd_line, self.timeout));
        };

        let output = CommandOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        };

        if !output.success() {
            warn!(
                "{} exited with {:?}: {}",
                cmd_line,
                output.exit_code,
                output.stderr.trim()
            );
        }

        Ok(output)
    }
}

fn wait_child(
    child: &mut Child,
    deadline: Option<Instant>,
    cmd_line: &str,
    timeout: Option<Duration>,
) -> Result<ExitStatus> {
    let subprocess_err = |source: std::io::Error| TrackNodesError::Subprocess {
        command: cmd_line.to_string(),
        source,
    };

    let Some(deadline) = deadline else {
        return child.wait().map_err(subprocess_err);
    };

    let remaining = deadline.saturating_duration_since(Instant::now());
    match child.wait_timeout(remaining).map_err(subprocess_err)? {
        Some(status) => Ok(status),
        None => {
            kill_process_group(child);
            let _ = child.kill();
            let _ = child.wait();
            Err(timed_out(cmd_line, timeout))
        }
    }
}

fn timed_out(cmd_line: &str, timeout: Option<Duration>) -> TrackNodesError {
    TrackNodesError::CommandTimedOut {
        command: cmd_line.to_string(),
        secs: timeout.map(|t| t.as_secs()).unwrap_or_default(),
    }
}

fn kill_process_group(child: &Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        debug!("killpg {} failed: {}", pgid, e);
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Collect one pipe, or None if the deadline passed first.
fn drain(reader: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Option<String> {
    let Some(rx) = reader else {
        return Some(String::new());
    };

    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };

    match received {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

/// Render a program and its arguments for logs and errors.
pub fn display_command(program: &Path, args: &[&str]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().map(|a| a.to_string()));
    parts.join(" ")
}
