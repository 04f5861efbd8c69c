//! Control commands - restart or stop the bridge from the client
//!
//! Two reserved command strings are intercepted before the guard and the
//! executor ever see them. The response goes out first; the process action
//! fires after a short delay so the client receives it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub const RESTART_SENTINEL: &str = "__RESTART__";
pub const SHUTDOWN_SENTINEL: &str = "__SHUTDOWN__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Restart,
    Shutdown,
}

impl ControlCommand {
    /// Match the trimmed command text against the sentinels
    pub fn detect(command: &str) -> Option<Self> {
        match command.trim() {
            RESTART_SENTINEL => Some(ControlCommand::Restart),
            SHUTDOWN_SENTINEL => Some(ControlCommand::Shutdown),
            _ => None,
        }
    }

    /// Text returned to the client before acting
    pub fn message(&self) -> &'static str {
        match self {
            ControlCommand::Restart => "Restarting server...\n",
            ControlCommand::Shutdown => "Server shutting down...\n",
        }
    }
}

/// Process-level actions behind the control commands
pub trait ProcessControl: Send + Sync {
    /// Replace the running process with a fresh copy of itself
    fn restart(&self);
    /// Terminate the process
    fn shutdown(&self);
}

/// Acts on the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct SelfProcess;

impl ProcessControl for SelfProcess {
    fn restart(&self) {
        let err = reexec();
        tracing::error!("Restart failed: {}", err);
        std::process::exit(1);
    }

    fn shutdown(&self) {
        tracing::warn!("Shutting down");
        std::process::exit(0);
    }
}

/// Same executable, same arguments; only returns on failure
#[cfg(unix)]
fn reexec() -> std::io::Error {
    use std::os::unix::process::CommandExt;

    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return e,
    };
    std::process::Command::new(exe)
        .args(std::env::args_os().skip(1))
        .exec()
}

#[cfg(not(unix))]
fn reexec() -> std::io::Error {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return e,
    };
    match std::process::Command::new(exe)
        .args(std::env::args_os().skip(1))
        .spawn()
    {
        Ok(_) => std::process::exit(0),
        Err(e) => e,
    }
}

/// Run the action for `command` once `delay` has elapsed
pub fn schedule(
    control: Arc<dyn ProcessControl>,
    command: ControlCommand,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match command {
            ControlCommand::Restart => {
                tracing::warn!("Restarting");
                control.restart();
            }
            ControlCommand::Shutdown => control.shutdown(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        restarts: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl ProcessControl for Recorder {
        fn restart(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_detect() {
        assert_eq!(ControlCommand::detect("__RESTART__"), Some(ControlCommand::Restart));
        assert_eq!(
            ControlCommand::detect("  __SHUTDOWN__\n"),
            Some(ControlCommand::Shutdown)
        );
        assert_eq!(ControlCommand::detect("echo __RESTART__"), None);
        assert_eq!(ControlCommand::detect("__restart__"), None);
        assert_eq!(ControlCommand::detect(""), None);
    }

    #[tokio::test]
    async fn test_schedule_waits_for_delay() {
        let recorder = Arc::new(Recorder::default());
        let handle = schedule(
            recorder.clone(),
            ControlCommand::Shutdown,
            Duration::from_millis(100),
        );

        assert_eq!(recorder.shutdowns.load(Ordering::SeqCst), 0);
        handle.await.unwrap();
        assert_eq!(recorder.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.restarts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schedule_restart() {
        let recorder = Arc::new(Recorder::default());
        schedule(recorder.clone(), ControlCommand::Restart, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(recorder.restarts.load(Ordering::SeqCst), 1);
    }
}
