//! Response encoding
//!
//! Every response is JSON. Successes carry `{output, cwd}`; failures carry
//! `{error, output, cwd?}` where `error` is a stable code and `output` the
//! human-readable message, so clients that only read `output` still show it.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::BridgeError;
use crate::exec::CommandResult;

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl ErrorResponse {
    pub fn new(err: &BridgeError, cwd: Option<String>) -> Self {
        Self {
            error: err.code(),
            output: err.to_string(),
            cwd,
        }
    }
}

/// 200 with the command result
pub fn success(result: CommandResult) -> Response {
    Json(result).into_response()
}

/// Status from the error, body from [`ErrorResponse`]
///
/// `cwd` is the request's working directory once it has been parsed.
pub fn failure(err: &BridgeError, cwd: Option<String>) -> Response {
    (err.status(), Json(ErrorResponse::new(err, cwd))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    #[test]
    fn test_error_body_shape() {
        let err = BridgeError::Timeout(15);
        let body = serde_json::to_value(ErrorResponse::new(&err, Some("/tmp".into()))).unwrap();
        assert_eq!(body["error"], "timeout");
        assert_eq!(body["cwd"], "/tmp");
        assert!(body["output"].as_str().unwrap().contains("timed out"));
    }

    #[test]
    fn test_cwd_omitted_before_parse() {
        let err = BridgeError::Unauthorized("missing Authorization header".into());
        let body = serde_json::to_value(ErrorResponse::new(&err, None)).unwrap();
        assert!(body.get("cwd").is_none());
        assert!(body["output"].as_str().unwrap().starts_with("Unauthorized"));
    }

    #[test]
    fn test_statuses_and_content_type() {
        let ok = success(CommandResult {
            output: "hi\n".into(),
            cwd: "/".into(),
        });
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            ok.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bad = failure(&BridgeError::BadRequest("nope".into()), None);
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            bad.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
