//! Command guard - rejects commands that would hang waiting on a terminal
//!
//! Checks are lexical: the first whitespace-separated token is the base
//! command and the remaining tokens are its arguments. Shell metacharacters
//! after a permitted first token are not inspected.

use std::collections::HashSet;

use regex::Regex;

use crate::config::GuardConfig;
use crate::error::{BridgeError, ConfigError};

/// Flags that make a package install non-interactive
const ASSUME_YES_FLAGS: &[&str] = &["-y", "--yes", "--assume-yes"];

/// Command execution guard with deny list enforcement
#[derive(Debug, Clone)]
pub struct CommandGuard {
    interactive: HashSet<String>,
    package_managers: HashSet<String>,
    deny_patterns: Vec<Regex>,
}

impl CommandGuard {
    /// Create a new CommandGuard from config
    pub fn new(config: &GuardConfig) -> Result<Self, ConfigError> {
        let deny_patterns = config
            .deny_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            interactive: config.interactive_commands.iter().cloned().collect(),
            package_managers: config.package_managers.iter().cloned().collect(),
            deny_patterns,
        })
    }

    /// Check if a command is allowed to reach the executor
    pub fn check_command(&self, command: &str) -> Result<(), BridgeError> {
        let mut tokens = command.split_whitespace();
        let Some(first) = tokens.next() else {
            return Ok(());
        };
        let args: Vec<&str> = tokens.collect();
        let base = base_name(first);

        if self.interactive.contains(base) {
            return Err(BridgeError::BadRequest(format!(
                "Interactive command '{}' is not supported: it needs a terminal and would hang until the timeout. \
                 Use a non-interactive alternative (e.g. cat instead of less, sed instead of vim).",
                base
            )));
        }

        if self.package_managers.contains(base)
            && args.contains(&"install")
            && !args.iter().any(|a| is_assume_yes(a))
        {
            return Err(BridgeError::BadRequest(format!(
                "'{} install' prompts for confirmation. Add -y to run it non-interactively.",
                base
            )));
        }

        for pattern in &self.deny_patterns {
            if pattern.is_match(command) {
                return Err(BridgeError::BadRequest(format!(
                    "Command matches deny pattern: {}",
                    pattern.as_str()
                )));
            }
        }

        Ok(())
    }
}

/// `/usr/bin/vim` -> `vim`
fn base_name(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

/// `-y`, `--yes`, `--assume-yes`, or a short flag cluster such as `-qy`
fn is_assume_yes(arg: &str) -> bool {
    if ASSUME_YES_FLAGS.contains(&arg) {
        return true;
    }
    match arg.strip_prefix('-') {
        Some(cluster) if !cluster.starts_with('-') => {
            !cluster.is_empty() && cluster.chars().all(|c| c.is_ascii_alphabetic()) && cluster.contains('y')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> CommandGuard {
        CommandGuard::new(&GuardConfig::default()).unwrap()
    }

    #[test]
    fn test_interactive_commands_blocked() {
        let guard = guard();
        for cmd in ["vim", "vim notes.md", "less log.txt", "top", "htop", "man ls", "ssh host", "nano a"] {
            assert!(
                matches!(guard.check_command(cmd), Err(BridgeError::BadRequest(_))),
                "{cmd} should be blocked"
            );
        }
    }

    #[test]
    fn test_interactive_blocked_by_path() {
        assert!(guard().check_command("/usr/bin/vim file").is_err());
    }

    #[test]
    fn test_safe_commands_allowed() {
        let guard = guard();
        assert!(guard.check_command("ls -la").is_ok());
        assert!(guard.check_command("cat /tmp/foo.txt").is_ok());
        assert!(guard.check_command("echo hello").is_ok());
        assert!(guard.check_command("git status").is_ok());
        assert!(guard.check_command("").is_ok());
        assert!(guard.check_command("   ").is_ok());
        // only the first token is the program
        assert!(guard.check_command("echo vim").is_ok());
    }

    #[test]
    fn test_bare_interpreters_allowed() {
        // stdin is null, so an interpreter without arguments exits at EOF
        let guard = guard();
        for cmd in ["python", "  node  ", "sh", "bash", "python3"] {
            assert!(guard.check_command(cmd).is_ok(), "{cmd} should be allowed");
        }
        assert!(guard.check_command("python script.py").is_ok());
        assert!(guard.check_command("python - <<'EOF'\nprint(1)\nEOF").is_ok());
        assert!(guard.check_command("sh -c 'echo hi'").is_ok());
    }

    #[test]
    fn test_package_install_requires_yes() {
        let guard = guard();
        assert!(matches!(
            guard.check_command("pkg install foo"),
            Err(BridgeError::BadRequest(_))
        ));
        assert!(guard.check_command("apt-get install curl").is_err());
        assert!(guard.check_command("pkg install foo -y").is_ok());
        assert!(guard.check_command("pkg install -y foo").is_ok());
        assert!(guard.check_command("apt install --yes curl").is_ok());
        assert!(guard.check_command("apt-get --assume-yes install curl").is_ok());
        assert!(guard.check_command("apt-get -qy install curl").is_ok());
        assert!(guard.check_command("pkg list-installed").is_ok());
        assert!(guard.check_command("pip install requests").is_ok());
    }

    #[test]
    fn test_assume_yes_flag_detection() {
        assert!(is_assume_yes("-y"));
        assert!(is_assume_yes("-qy"));
        assert!(is_assume_yes("--yes"));
        assert!(!is_assume_yes("--yellow"));
        assert!(!is_assume_yes("-"));
        assert!(!is_assume_yes("-q"));
        assert!(!is_assume_yes("yes"));
    }

    #[test]
    fn test_deny_patterns() {
        let config = GuardConfig {
            deny_patterns: vec![r"rm\s+-rf\s+/\s*$".to_string()],
            ..GuardConfig::default()
        };
        let guard = CommandGuard::new(&config).unwrap();
        assert!(guard.check_command("rm -rf /").is_err());
        assert!(guard.check_command("rm -rf ./build").is_ok());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = GuardConfig {
            deny_patterns: vec!["(".to_string()],
            ..GuardConfig::default()
        };
        assert!(matches!(
            CommandGuard::new(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
