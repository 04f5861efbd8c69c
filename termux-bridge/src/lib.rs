//! Termux Bridge Library
//!
//! Local HTTP bridge that runs shell commands for a note-taking client.
//! Requests are authenticated against a token file, filtered for commands
//! that need a terminal, executed under a timeout, and answered with the
//! combined output and the directory the shell ended up in.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use termux_bridge::{Config, server};
//!
//! let config = Config::load(None)?;
//! server::serve(&config).await?;
//! ```

pub mod auth;
pub mod config;
pub mod control;
pub mod error;
pub mod exec;
pub mod guard;
pub mod handlers;
pub mod init;
pub mod payload;
pub mod response;
pub mod server;
pub mod token;

pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use exec::{CommandResult, CommandRunner, ShellExecutor};
pub use handlers::Bridge;
