//! Request payload parsing
//!
//! Two wire shapes are accepted:
//! - structured: `{"cmd": "...", "cwd": "..."}`
//! - legacy: the raw body text is the command
//!
//! A body that looks like a JSON object but fails to decode is rejected
//! instead of being run as text.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::expand_tilde;
use crate::error::{BridgeError, BridgeResult};

/// A command resolved from the request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub cwd: PathBuf,
}

/// Validate the `Content-Length` header value
pub fn content_length(header: Option<&str>) -> BridgeResult<usize> {
    let value = header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BridgeError::BadRequest("Missing Content-Length header".to_string()))?;

    value
        .parse()
        .map_err(|_| BridgeError::BadRequest(format!("Invalid Content-Length: {}", value)))
}

/// Decode a request body into a [`CommandRequest`]
pub fn parse_payload(body: &[u8], home: &Path) -> BridgeResult<CommandRequest> {
    let text = String::from_utf8_lossy(body);

    let request = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => {
            let command = match map.get("cmd") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    return Err(BridgeError::BadRequest(
                        "Invalid JSON payload: \"cmd\" must be a string".to_string(),
                    ))
                }
            };
            let cwd = match map.get("cwd") {
                None | Some(Value::Null) => home.to_path_buf(),
                Some(Value::String(s)) if s.trim().is_empty() => home.to_path_buf(),
                Some(Value::String(s)) => expand_tilde(s, home),
                Some(_) => {
                    return Err(BridgeError::BadRequest(
                        "Invalid JSON payload: \"cwd\" must be a string".to_string(),
                    ))
                }
            };
            CommandRequest { command, cwd }
        }
        // Valid JSON but not an object: keep the legacy text semantics
        Ok(_) => CommandRequest {
            command: text.into_owned(),
            cwd: home.to_path_buf(),
        },
        Err(e) if text.trim_start().starts_with('{') => {
            return Err(BridgeError::BadRequest(format!("Invalid JSON payload: {}", e)));
        }
        Err(_) => CommandRequest {
            command: text.into_owned(),
            cwd: home.to_path_buf(),
        },
    };

    // Double-encoded payloads must never reach the shell
    if request.command.trim_start().starts_with('{') && request.command.contains("cmd") {
        return Err(BridgeError::BadRequest(
            "Invalid JSON payload: command looks like an encoded request".to_string(),
        ));
    }

    Ok(request)
}
