//! Configuration types and loading
//!
//! Every section is optional; a missing file yields [`Config::default`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the shared secret inside the home directory
pub const TOKEN_FILE_NAME: &str = ".obsidian_termux_token";

/// Env var naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TERMUX_BRIDGE_CONFIG";

// ============================================================================
// Configuration Types
// ============================================================================

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub environment: EnvConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Loopback port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Home directory override (default working directory and token root)
    #[serde(default)]
    pub home: Option<PathBuf>,
}

fn default_port() -> u16 {
    8085
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            home: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token file path; `~` expands to the home directory
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Shell used as `<shell> -c <script>`
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Hard wall-clock limit per command
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_shell() -> String {
    if Path::new("/bin/sh").exists() {
        return "/bin/sh".to_string();
    }
    // Termux keeps its userland under $PREFIX
    if let Ok(prefix) = std::env::var("PREFIX") {
        let candidate = Path::new(&prefix).join("bin").join("sh");
        if candidate.exists() {
            return candidate.to_string_lossy().into_owned();
        }
    }
    "sh".to_string()
}

fn default_timeout() -> u64 {
    15
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum output size per stream (stdout/stderr) in bytes
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

fn default_max_output() -> usize {
    1024 * 1024 // 1MB
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: default_max_output(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Delay between answering a control command and acting on it
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    500
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Programs that need a terminal and would hang until the timeout
    #[serde(default = "default_interactive")]
    pub interactive_commands: Vec<String>,

    /// Package managers whose `install` prompts for confirmation
    #[serde(default = "default_package_managers")]
    pub package_managers: Vec<String>,

    /// Extra regex patterns matched against the whole command
    #[serde(default)]
    pub deny_patterns: Vec<String>,
}

fn default_interactive() -> Vec<String> {
    [
        "vim", "vi", "nvim", "nano", "emacs", "pico", "less", "more", "most", "top", "htop",
        "btop", "man", "ssh", "telnet", "ftp", "sftp", "watch", "tmux", "screen",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_package_managers() -> Vec<String> {
    ["pkg", "apt", "apt-get", "dnf", "yum"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            interactive_commands: default_interactive(),
            package_managers: default_package_managers(),
            deny_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Environment variables to set
    #[serde(default)]
    pub set: HashMap<String, String>,
    /// Environment variables to remove
    #[serde(default)]
    pub remove: Vec<String>,
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load config from an explicit path or the standard locations
    ///
    /// Search order:
    /// 1. `explicit` (the `--config` flag)
    /// 2. `TERMUX_BRIDGE_CONFIG` env var
    /// 3. `~/.termux-bridge.toml`
    /// 4. `$XDG_CONFIG_HOME/termux-bridge/config.toml`
    /// 5. Default config if none found
    ///
    /// A named file (1 or 2) must parse; discovered files that fail are skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        if let Some(path) = named {
            let config = Self::load_from_path(&path)?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        let mut config_paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            config_paths.push(home.join(".termux-bridge.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("termux-bridge").join("config.toml"));
        }

        for path in config_paths {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    return Ok(config);
                }
                Err(e) => tracing::warn!("Skipping config: {}", e),
            }
        }

        tracing::info!("Using default configuration");
        Ok(Config::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Home directory: the configured override, else the user's home
    pub fn home_dir(&self) -> Result<PathBuf, ConfigError> {
        self.server
            .home
            .clone()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoHome)
    }

    /// Location of the token file for the given home directory
    pub fn token_path(&self, home: &Path) -> PathBuf {
        match &self.token.path {
            Some(path) => expand_tilde(path, home),
            None => home.join(TOKEN_FILE_NAME),
        }
    }
}

/// Resolve a leading `~` against `home`
pub fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(path)
}
