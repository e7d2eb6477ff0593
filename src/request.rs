//! JSON request boundary.
//!
//! Accepts `{ "path": "...", "type": "dir" | "file" }` and answers with the
//! processed entries, or `{ "error": "..." }` and a non-200 status.

use crate::{error::Error, filter::ProcessOptions, walker::Processor};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// HTTP-style status codes used by [`handle`].
pub mod status {
    /// Success
    pub const OK: u16 = 200;
    /// Malformed request
    pub const BAD_REQUEST: u16 = 400;
    /// Processing failed
    pub const INTERNAL_ERROR: u16 = 500;
}

#[derive(Debug, Deserialize)]
struct RequestBody {
    #[serde(default)]
    path: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// A status code and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// JSON payload
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self {
            status: status::OK,
            body,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Handles one request body with default options.
///
/// A `dir` request answers with an array of entries, a `file` request with
/// one entry.
#[must_use]
pub fn handle(body: &str) -> Response {
    handle_with(body, &Processor::new(ProcessOptions::default()))
}

/// Handles one request body with the given processor.
#[must_use]
pub fn handle_with(body: &str, processor: &Processor) -> Response {
    let request: RequestBody = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected malformed request: {}", e);
            return Response::error(status::BAD_REQUEST, format!("Invalid request body: {e}"));
        }
    };

    info!(
        "Request: path={:?} type={:?}",
        request.path.as_deref().unwrap_or_default(),
        request.kind.as_deref().unwrap_or_default()
    );

    let Some(path) = request.path.filter(|p| !p.is_empty()) else {
        return Response::error(status::BAD_REQUEST, "Path is required");
    };

    let result = match request.kind.as_deref() {
        Some("dir") => processor
            .process_directory(Path::new(&path))
            .and_then(|entries| serde_json::to_value(entries).map_err(Error::from)),
        Some("file") => {
            serde_json::to_value(processor.process_file(Path::new(&path))).map_err(Error::from)
        }
        _ => return Response::error(status::BAD_REQUEST, "Invalid type"),
    };

    match result {
        Ok(body) => {
            debug!("Request for {} succeeded", path);
            Response::ok(body)
        }
        Err(e) => {
            warn!("Request for {} failed: {}", path, e);
            Response::error(status::INTERNAL_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn request(path: &Path, kind: &str) -> String {
        json!({ "path": path, "type": kind }).to_string()
    }

    #[test]
    fn test_malformed_json() {
        let response = handle("{not json");
        assert_eq!(response.status, status::BAD_REQUEST);
        assert!(response.body["error"].is_string());
    }

    #[test]
    fn test_missing_or_empty_path() {
        let response = handle(r#"{"type":"dir"}"#);
        assert_eq!(response.status, status::BAD_REQUEST);
        assert_eq!(response.body["error"], "Path is required");

        let response = handle(r#"{"path":"","type":"dir"}"#);
        assert_eq!(response.status, status::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_type() {
        let temp = assert_fs::TempDir::new().unwrap();
        let response = handle(&request(temp.path(), "archive"));
        assert_eq!(response.status, status::BAD_REQUEST);
        assert_eq!(response.body["error"], "Invalid type");
    }

    #[test]
    fn test_directory_request() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.py").write_str("x=1").unwrap();

        let response = handle(&request(temp.path(), "dir"));
        assert!(response.is_success());

        let entries = response.body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["extension"], ".py");
        assert_eq!(entries[0]["text"], "x=1");
        assert!(entries[0]["filePath"].as_str().unwrap().ends_with("a.py"));
    }

    #[test]
    fn test_file_request() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("notes.md");
        file.write_str("# Notes").unwrap();

        let response = handle(&request(file.path(), "file"));
        assert_eq!(response.status, status::OK);
        assert_eq!(response.body["text"], "# Notes");
    }

    #[test]
    fn test_missing_file_still_succeeds() {
        let temp = assert_fs::TempDir::new().unwrap();
        let response = handle(&request(&temp.path().join("gone.txt"), "file"));

        assert_eq!(response.status, status::OK);
        assert!(response.body["text"]
            .as_str()
            .unwrap()
            .starts_with("[Error processing Text:"));
    }

    #[test]
    fn test_missing_directory_is_internal_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let response = handle(&request(&temp.path().join("gone"), "dir"));

        assert_eq!(response.status, status::INTERNAL_ERROR);
        assert!(response.body["error"].as_str().unwrap().contains("gone"));
    }
}
