//! Child process execution with concurrently drained, size-capped output.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Bytes kept from one stream plus how many were dropped past the cap.
#[derive(Debug, Default)]
pub struct Capture {
    pub bytes: Vec<u8>,
    pub dropped: u64,
}

impl Capture {
    fn render_into(&self, label: &str, text: &mut String) {
        text.push_str(&String::from_utf8_lossy(&self.bytes));
        if self.dropped > 0 {
            text.push_str(&format!("\n[{label}: {} more bytes dropped]\n", self.dropped));
        }
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Capture,
    pub stderr: Capture,
    /// The child was killed after exceeding its time limit.
    pub timed_out: bool,
}

impl CommandOutput {
    /// Stdout then stderr as one lossily decoded string.
    pub fn combined_text(&self) -> String {
        let mut text = String::new();
        self.stdout.render_into("stdout", &mut text);
        self.stderr.render_into("stderr", &mut text);
        if self.timed_out {
            text.push_str("\n[killed after timeout]\n");
        }
        text
    }
}

/// Spawn `cmd` and wait for it, reading stdout and stderr on their own threads.
///
/// At most `output_limit_bytes` are kept per stream; the rest is drained and
/// counted so the child never blocks on a full pipe. `timeout = None` waits
/// for the child however long it takes.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn command")?;

    let limit = output_limit_bytes as u64;
    let stdout = drain(child.stdout.take(), limit).context("attach stdout")?;
    let stderr = drain(child.stderr.take(), limit).context("attach stderr")?;

    let (status, timed_out) = wait(&mut child, timeout)?;

    let output = CommandOutput {
        status,
        stdout: collect(stdout).context("read stdout")?,
        stderr: collect(stderr).context("read stderr")?,
        timed_out,
    };
    if output.stdout.dropped > 0 || output.stderr.dropped > 0 {
        warn!(
            stdout_dropped = output.stdout.dropped,
            stderr_dropped = output.stderr.dropped,
            "output capped"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "child exited");
    Ok(output)
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(limit) = timeout else {
        return Ok((child.wait().context("wait for command")?, false));
    };
    if let Some(status) = child.wait_timeout(limit).context("wait for command")? {
        return Ok((status, false));
    }
    warn!(timeout_secs = limit.as_secs(), "time limit reached, killing child");
    child.kill().context("kill command")?;
    Ok((child.wait().context("reap killed command")?, true))
}

fn drain<R>(stream: Option<R>, limit: u64) -> Result<JoinHandle<io::Result<Capture>>>
where
    R: Read + Send + 'static,
{
    let stream = stream.ok_or_else(|| anyhow!("stream was not piped"))?;
    Ok(thread::spawn(move || capture(stream, limit)))
}

fn collect(handle: JoinHandle<io::Result<Capture>>) -> Result<Capture> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader panicked"))?
        .map_err(Into::into)
}

fn capture<R: Read>(mut reader: R, limit: u64) -> io::Result<Capture> {
    let mut bytes = Vec::new();
    (&mut reader).take(limit).read_to_end(&mut bytes)?;
    let dropped = io::copy(&mut reader, &mut io::sink())?;
    Ok(Capture { bytes, dropped })
}
