// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use log::{debug, warn};
use nix::sys::signal::{self, Signal};
use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Something that can run an argument vector to completion and tell whether it worked.
///
/// The worker pool only depends on this trait, so tests can swap in executors that
/// do not spawn real processes.
pub trait Executor: Send + Sync + 'static {
    fn run(&self, args: &[String]) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessFailure {
    #[error("empty argument vector")]
    EmptyCommand,
    #[error("could not spawn {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program} exited with status {code}")]
    NonZeroExit { program: String, code: i32 },
    #[error("{program} was terminated by signal {signal}")]
    Signaled { program: String, signal: String },
    #[error("waiting for {program} failed: {source}")]
    Wait { program: String, source: io::Error },
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// Spawns one child per invocation, never through a shell.
///
/// stdin, stdout and stderr of the child are attached to the null device, so
/// converter chatter never reaches our own logs.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill children that run longer than `timeout`. Without this a hung converter
    /// occupies its worker forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs `args` and reports why it failed, if it did.
    pub fn execute(&self, args: &[String]) -> Result<(), ProcessFailure> {
        let (program, rest) = args.split_first().ok_or(ProcessFailure::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ProcessFailure::Spawn {
                program: program.clone(),
                source,
            })?;
        debug!("spawned {} as pid {}", program, child.id());

        let status = match self.timeout {
            None => child.wait().map_err(|source| ProcessFailure::Wait {
                program: program.clone(),
                source,
            })?,
            Some(timeout) => wait_with_timeout(&mut child, program, timeout)?,
        };

        map_exit_status(program, status)
    }
}

impl Executor for ProcessExecutor {
    fn run(&self, args: &[String]) -> bool {
        match self.execute(args) {
            Ok(()) => true,
            Err(failure) => {
                warn!("{failure}");
                false
            }
        }
    }
}

fn map_exit_status(program: &str, status: ExitStatus) -> Result<(), ProcessFailure> {
    match (status.code(), status.signal()) {
        (Some(0), _) => Ok(()),
        (Some(code), _) => Err(ProcessFailure::NonZeroExit {
            program: program.to_string(),
            code,
        }),
        (None, signal) => {
            let signal = signal
                .and_then(|raw| Signal::try_from(raw).ok())
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Err(ProcessFailure::Signaled {
                program: program.to_string(),
                signal,
            })
        }
    }
}

fn wait_with_timeout(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<ExitStatus, ProcessFailure> {
    let wait_error = |source| ProcessFailure::Wait {
        program: program.to_string(),
        source,
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(wait_error)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    warn!(
        "{} (pid {}) exceeded {:?}, terminating",
        program,
        child.id(),
        timeout
    );
    let pid = nix::unistd::Pid::from_raw(child.id() as i32);

    // First: SIGTERM
    let _ = signal::kill(pid, Signal::SIGTERM);
    let grace_deadline = Instant::now() + TERMINATE_GRACE;
    while Instant::now() < grace_deadline {
        if child.try_wait().map_err(wait_error)?.is_some() {
            return Err(ProcessFailure::TimedOut {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }

    // Still alive -> SIGKILL
    let _ = child.kill();
    let _ = child.wait();
    Err(ProcessFailure::TimedOut {
        program: program.to_string(),
        timeout,
    })
}
