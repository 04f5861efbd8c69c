//! Termux Bridge - run shell commands for a note-taking client over local HTTP

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use termux_bridge::{init, server, Config};

#[derive(Parser)]
#[command(name = "termux-bridge")]
#[command(about = "Authenticated local HTTP bridge that runs shell commands")]
struct Cli {
    /// Config file (default: ~/.termux-bridge.toml or $XDG_CONFIG_HOME/termux-bridge/config.toml)
    #[arg(long, env = "TERMUX_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Loopback port to listen on (overrides the config file)
    #[arg(long, short, env = "TERMUX_BRIDGE_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v debug, -vv trace). Default is info.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init::init_tracing(cli.verbose)?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    server::serve(&config).await
}
