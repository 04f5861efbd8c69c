//! Shell execution with working-directory tracking
//!
//! The command is wrapped in a script that prints a per-invocation marker
//! and then `pwd`, so the directory the shell ends up in can be recovered
//! from stdout even when the command itself ran `cd`.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::config::{Config, EnvConfig};
use crate::error::{BridgeError, BridgeResult};

/// Successful command outcome as sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub output: String,
    pub cwd: String,
}

/// Something that can run a shell command in a directory
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> BridgeResult<CommandResult>;
}

// ============================================================================
// Marker protocol
// ============================================================================

/// Fresh marker for one invocation
pub fn new_marker() -> String {
    format!("__TERMUX_BRIDGE_CWD_{}__", Uuid::new_v4().simple())
}

/// Bytes kept from the end of stdout so the trailer survives truncation
const TRAILER_ROOM: usize = 4096;

/// Append the marker trailer to a command
///
/// The trailer sits on its own line so that a command ending in `&`, a
/// comment, or a heredoc terminator still parses. The marker is printed from
/// two halves and never appears whole in the script, so a command that
/// echoes the script back cannot fake it.
pub fn build_script(command: &str, marker: &str) -> String {
    let mid = marker
        .char_indices()
        .nth(marker.chars().count() / 2)
        .map_or(marker.len(), |(i, _)| i);
    let (head, tail) = marker.split_at(mid);
    format!("{}\nprintf '%s%s\\n' '{}' '{}'\npwd", command, head, tail)
}

/// Split stdout into command output and the directory printed by the trailer
///
/// Uses the last occurrence of the marker. The first non-empty line after
/// it is the directory; anything the command wrote after that (a background
/// job, for instance) is kept as output. Returns `None` for the directory
/// when the marker is absent or what follows it is not an absolute path.
pub fn split_marker(stdout: &str, marker: &str) -> (String, Option<String>) {
    let Some(idx) = stdout.rfind(marker) else {
        return (stdout.to_string(), None);
    };

    let mut output = stdout[..idx].to_string();
    let mut rest = stdout[idx + marker.len()..].lines().skip_while(|l| l.trim().is_empty());
    let cwd = rest.next().map(|l| l.trim().to_string());

    let trailing: Vec<&str> = rest.collect();
    if !trailing.is_empty() {
        output.push_str(&trailing.join("\n"));
        output.push('\n');
    }

    (output, cwd.filter(|c| Path::new(c).is_absolute()))
}

/// Truncate output to max bytes on a UTF-8 boundary
fn truncate_output(output: &[u8], max_bytes: usize) -> (String, bool) {
    if output.len() <= max_bytes {
        let text = String::from_utf8_lossy(output).to_string();
        (text, false)
    } else {
        // Back off only when the cut lands inside a multi-byte character
        let end = match std::str::from_utf8(&output[..max_bytes]) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => max_bytes,
        };
        let text = String::from_utf8_lossy(&output[..end]).to_string();
        (text, true)
    }
}

/// Bounded capture of one output stream
#[derive(Debug, Default)]
struct Capture {
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl Capture {
    fn into_bytes(mut self) -> Vec<u8> {
        self.head.append(&mut self.tail);
        self.head
    }
}

/// Keep the first `head_cap` and the last `tail_cap` bytes of a stream
///
/// Everything in between is read and discarded so the writer never blocks
/// on a full pipe.
async fn capture<R: AsyncRead + Unpin>(
    mut reader: R,
    head_cap: usize,
    tail_cap: usize,
) -> io::Result<Capture> {
    let mut out = Capture::default();
    (&mut reader)
        .take(head_cap as u64)
        .read_to_end(&mut out.head)
        .await?;

    if tail_cap == 0 {
        tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
        return Ok(out);
    }

    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        out.tail.extend_from_slice(&chunk[..n]);
        if out.tail.len() > tail_cap {
            let excess = out.tail.len() - tail_cap;
            out.tail.drain(..excess);
        }
    }
    Ok(out)
}

// ============================================================================
// Shell executor
// ============================================================================

/// Runs commands through `<shell> -c` under a hard timeout
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    timeout_secs: u64,
    max_output_bytes: usize,
    environment: EnvConfig,
}

impl ShellExecutor {
    pub fn new(config: &Config) -> Self {
        Self {
            shell: config.exec.shell.clone(),
            timeout_secs: config.exec.timeout_secs,
            max_output_bytes: config.limits.max_output_bytes,
            environment: config.environment.clone(),
        }
    }

    fn command(&self, script: &str, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(script)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down grandchildren too
        #[cfg(unix)]
        cmd.process_group(0);

        for (key, value) in &self.environment.set {
            cmd.env(key, value);
        }
        for key in &self.environment.remove {
            cmd.env_remove(key);
        }
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellExecutor {
    async fn run(&self, command: &str, cwd: &Path) -> BridgeResult<CommandResult> {
        let original_cwd = cwd.to_string_lossy().into_owned();
        let marker = new_marker();
        let script = build_script(command, &marker);

        let mut child = self.command(&script, cwd).spawn().map_err(|e| {
            BridgeError::ExecutionFault(format!(
                "failed to start {} in {}: {}",
                self.shell, original_cwd, e
            ))
        })?;
        let pid = child.id();

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::ExecutionFault("stdout not captured".to_string()))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::ExecutionFault("stderr not captured".to_string()))?;

        // one byte past the cap tells truncation apart from an exact fit
        let head_cap = self.max_output_bytes.saturating_add(1);
        let collect = async {
            tokio::try_join!(
                child.wait(),
                capture(stdout_pipe, head_cap, marker.len() + TRAILER_ROOM),
                capture(stderr_pipe, head_cap, 0),
            )
        };
        let outcome = tokio::time::timeout(Duration::from_secs(self.timeout_secs), collect).await;

        match outcome {
            Ok(Ok((_, stdout, stderr))) => {
                let stdout = stdout.into_bytes();
                let stdout = String::from_utf8_lossy(&stdout);
                let (output, new_cwd) = split_marker(&stdout, &marker);
                let (mut output, out_truncated) =
                    truncate_output(output.as_bytes(), self.max_output_bytes);
                let (stderr, err_truncated) =
                    truncate_output(&stderr.into_bytes(), self.max_output_bytes);
                if out_truncated || err_truncated {
                    tracing::debug!("Output truncated to {} bytes per stream", self.max_output_bytes);
                }
                output.push_str(&stderr);

                Ok(CommandResult {
                    output,
                    cwd: new_cwd.unwrap_or(original_cwd),
                })
            }
            Ok(Err(io_err)) => {
                tracing::error!("Reading command output failed: {}", io_err);
                abort(&mut child, pid).await;
                Err(BridgeError::ExecutionFault(io_err.to_string()))
            }
            Err(_elapsed) => {
                tracing::error!(
                    "Command timed out after {}s, killing process group",
                    self.timeout_secs
                );
                abort(&mut child, pid).await;
                Err(BridgeError::Timeout(self.timeout_secs))
            }
        }
    }
}

/// Kill the shell's whole process group and reap the shell
async fn abort(child: &mut Child, pid: Option<u32>) {
    kill_process_group(pid);
    let _ = child.kill().await;
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // SAFETY: kill(2) with a negative pid addresses the process group that
    // process_group(0) created for this child; no memory is touched.
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!("Failed to kill process group {}: {}", pid, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
