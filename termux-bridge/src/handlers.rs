//! Request pipeline
//!
//! authenticate -> parse -> control -> guard -> execute, one request at a
//! time. The lock is a FIFO `tokio::sync::Mutex`, so requests are served in
//! arrival order and the shell session stays linear.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use axum::response::Response;
use tokio::sync::Mutex;

use crate::auth;
use crate::config::Config;
use crate::control::{self, ControlCommand, ProcessControl, SelfProcess};
use crate::error::{BridgeResult, ConfigError};
use crate::exec::{CommandResult, CommandRunner, ShellExecutor};
use crate::guard::CommandGuard;
use crate::payload;
use crate::response;
use crate::token::TokenStore;

/// Everything a request needs, shared across connections
pub struct Bridge {
    tokens: TokenStore,
    home: PathBuf,
    guard: CommandGuard,
    runner: Arc<dyn CommandRunner>,
    control: Arc<dyn ProcessControl>,
    control_delay: Duration,
    turn: Mutex<()>,
}

impl Bridge {
    /// Bridge that runs real shell commands and controls this process
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_parts(
            config,
            Arc::new(ShellExecutor::new(config)),
            Arc::new(SelfProcess),
        )
    }

    /// Bridge with explicit runner and process control
    pub fn with_parts(
        config: &Config,
        runner: Arc<dyn CommandRunner>,
        control: Arc<dyn ProcessControl>,
    ) -> Result<Self, ConfigError> {
        let home = config.home_dir()?;
        Ok(Self {
            tokens: TokenStore::new(config.token_path(&home)),
            guard: CommandGuard::new(&config.guard)?,
            home,
            runner,
            control,
            control_delay: Duration::from_millis(config.control.delay_ms),
            turn: Mutex::new(()),
        })
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    /// Handle one request end to end and encode the result
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> Response {
        let _turn = self.turn.lock().await;

        let mut cwd = None;
        match self.process(headers, body, &mut cwd).await {
            Ok(result) => response::success(result),
            Err(err) => {
                tracing::debug!("Request failed ({}): {}", err.code(), err);
                response::failure(&err, cwd)
            }
        }
    }

    async fn process(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        cwd: &mut Option<String>,
    ) -> BridgeResult<CommandResult> {
        auth::authorize(header_value(headers, header::AUTHORIZATION), self.tokens.load())?;

        payload::content_length(header_value(headers, header::CONTENT_LENGTH))?;
        let request = payload::parse_payload(body, &self.home)?;
        let request_cwd = request.cwd.to_string_lossy().into_owned();
        *cwd = Some(request_cwd.clone());

        // Sentinels never reach the guard or the shell
        if let Some(command) = ControlCommand::detect(&request.command) {
            tracing::warn!("Control command received: {:?}", command);
            control::schedule(self.control.clone(), command, self.control_delay);
            return Ok(CommandResult {
                output: command.message().to_string(),
                cwd: request_cwd,
            });
        }

        if let Err(err) = self.guard.check_command(&request.command) {
            tracing::warn!("Blocked command: {}", request.command);
            return Err(err);
        }

        tracing::info!("Executing: {} (cwd {})", request.command, request_cwd);
        let result = self.runner.run(&request.command, &request.cwd).await;
        if let Err(err) = &result {
            tracing::error!("Command failed: {}", err);
        }
        result
    }
}

/// Header as text; a non-UTF-8 value reads as empty so it fails validation
fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).map(|v| v.to_str().unwrap_or(""))
}
