//! Subprocess execution with combined output capture.
//!
//! Both the build pipeline and the execution engine run an external program,
//! wait for it, and keep whatever it wrote to stdout and stderr. This module
//! owns that shared mechanic:
//!
//! - stdout and stderr are drained concurrently into one buffer, in arrival
//!   order, so the result reads like a terminal transcript
//! - a hard time bound kills the child when exceeded
//! - children are spawned with `kill_on_drop`, so dropping the future (for
//!   instance because the HTTP client went away) also kills the process

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Result of a process that ran to completion.
#[derive(Debug)]
pub struct CapturedOutput {
    /// Exit status of the child.
    pub status: ExitStatus,
    /// Interleaved stdout and stderr.
    pub output: Vec<u8>,
    /// Wall-clock run time.
    pub duration: Duration,
}

impl CapturedOutput {
    /// Returns `true` if the child exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Human-readable exit description.
    pub fn describe_status(&self) -> String {
        match self.status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Why a process did not produce a [`CapturedOutput`].
#[derive(Debug)]
pub enum ProcessError {
    /// The program could not be started.
    Spawn(io::Error),
    /// Reading output or waiting on the child failed.
    Wait(io::Error),
    /// The child was killed after exceeding the time bound.
    TimedOut {
        /// Output captured before the kill.
        output: Vec<u8>,
    },
}

/// Run `command` to completion, capturing combined output.
///
/// stdin is closed; stdout and stderr are piped. The child is killed if it
/// runs longer than `limit`.
pub async fn run_captured(
    mut command: Command,
    limit: Duration,
) -> Result<CapturedOutput, ProcessError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = spawn(&mut command).await?;
    debug!(pid = child.id(), "Child process spawned");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let buffer = Mutex::new(Vec::new());

    let run = async {
        let (out, err) = tokio::join!(drain(stdout, &buffer), drain(stderr, &buffer));
        out?;
        err?;
        child.wait().await
    };
    let outcome = tokio::time::timeout(limit, run).await;

    match outcome {
        Ok(Ok(status)) => Ok(CapturedOutput {
            status,
            output: buffer.into_inner(),
            duration: start.elapsed(),
        }),
        Ok(Err(e)) => Err(ProcessError::Wait(e)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed out child");
            }
            Err(ProcessError::TimedOut {
                output: buffer.into_inner(),
            })
        }
    }
}

/// Spawn, retrying briefly on `ETXTBSY`.
///
/// A freshly written executable can still be open for writing in a child
/// that another thread forked before the writer closed it.
async fn spawn(command: &mut Command) -> Result<Child, ProcessError> {
    const ETXTBSY: i32 = 26;
    const ATTEMPTS: u32 = 5;

    let mut attempt = 1;
    loop {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempt < ATTEMPTS => {
                debug!(attempt, "Executable busy, retrying spawn");
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => return Err(ProcessError::Spawn(e)),
        }
    }
}

/// Copy everything from `stream` into `buffer` chunk by chunk.
async fn drain<R>(stream: Option<R>, buffer: &Mutex<Vec<u8>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(());
    };

    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.lock().extend_from_slice(&chunk[..n]);
    }
}
