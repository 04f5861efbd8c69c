//! Token store
//!
//! The shared secret lives in a plain-text file and is re-read on every
//! request, so rotating the file takes effect without a restart.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::BridgeError;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token file {0} does not exist")]
    Missing(PathBuf),

    #[error("token file {0} is empty")]
    Empty(PathBuf),

    #[error("failed to read token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<TokenError> for BridgeError {
    fn from(err: TokenError) -> Self {
        BridgeError::ServerMisconfigured(err.to_string())
    }
}

/// Reads the token from a fixed path
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current token value, trimmed of surrounding whitespace
    pub fn load(&self) -> Result<String, TokenError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TokenError::Missing(self.path.clone()))
            }
            Err(source) => {
                return Err(TokenError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let token = raw.trim();
        if token.is_empty() {
            return Err(TokenError::Empty(self.path.clone()));
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nope"));
        assert!(matches!(store.load(), Err(TokenError::Missing(_))));
    }

    #[test]
    fn test_empty_file_is_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        let store = TokenStore::new(&path);
        assert!(matches!(store.load(), Err(TokenError::Empty(_))));
    }

    #[test]
    fn test_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "SECRET_TOKEN_123\n").unwrap();
        assert_eq!(TokenStore::new(&path).load().unwrap(), "SECRET_TOKEN_123");
    }

    #[test]
    fn test_rotation_seen_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let store = TokenStore::new(&path);

        std::fs::write(&path, "first").unwrap();
        assert_eq!(store.load().unwrap(), "first");

        std::fs::write(&path, "second").unwrap();
        assert_eq!(store.load().unwrap(), "second");
    }

    #[test]
    fn test_maps_to_misconfigured() {
        let err: BridgeError = TokenError::Missing(PathBuf::from("/x")).into();
        assert!(matches!(err, BridgeError::ServerMisconfigured(_)));
    }
}
