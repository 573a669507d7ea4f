//! Error taxonomy and the two reporting channels.
//!
//! Request errors belong to the host page and never reach the sandbox.
//! Execution and resolution errors are contained by the sandbox and only
//! observed by the host as a secondary signal.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Message-bus tag the sandbox bootstrap stamps on diagnostics it posts.
pub const SANDBOX_MESSAGE_SOURCE: &str = "preview-sandbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPhase {
    Request,
    Execution,
    Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderError {
    pub phase: RenderPhase,
    pub message: String,
}

impl RenderError {
    pub fn new(phase: RenderPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

/// A failed request to an upstream generator, with an HTTP-style status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub status: u16,
    pub message: String,
}

impl RequestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }

    /// Wire body returned to the host page.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error_message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_message: String,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("API request failed: {0}")]
    Transport(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Failed to parse API response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid preview config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SandboxMessage {
    source: String,
    phase: RenderPhase,
    message: String,
}

/// Holds the latest error of each channel. Setting one channel never touches
/// the other, and nothing is retried: a new generation clears both.
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    request: Option<RenderError>,
    sandbox: Option<RenderError>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_request(&mut self, err: &RequestError) {
        warn!(status = err.status, message = %err.message, "generation request failed");
        self.request = Some(RenderError::new(RenderPhase::Request, err.message.clone()));
    }

    /// Records an in-sandbox diagnostic. Request-phase errors are ignored here;
    /// they belong to the host channel.
    pub fn report_sandbox(&mut self, err: RenderError) {
        if err.phase == RenderPhase::Request {
            return;
        }
        self.sandbox = Some(err);
    }

    /// Parses a message posted by the sandbox bootstrap. Returns whether it
    /// was recognised as a diagnostic.
    pub fn accept_sandbox_message(&mut self, payload: &str) -> bool {
        match serde_json::from_str::<SandboxMessage>(payload) {
            Ok(msg) if msg.source == SANDBOX_MESSAGE_SOURCE && msg.phase != RenderPhase::Request => {
                self.report_sandbox(RenderError::new(msg.phase, msg.message));
                true
            }
            _ => false,
        }
    }

    pub fn request_error(&self) -> Option<&str> {
        self.request.as_ref().map(|e| e.message.as_str())
    }

    pub fn sandbox_error(&self) -> Option<&RenderError> {
        self.sandbox.as_ref()
    }

    pub fn clear_sandbox(&mut self) {
        self.sandbox = None;
    }

    pub fn clear(&mut self) {
        self.request = None;
        self.sandbox = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_are_independent() {
        let mut reporter = ErrorReporter::new();
        reporter.report_request(&RequestError::bad_request("Prompt is required"));
        reporter.report_sandbox(RenderError::new(RenderPhase::Execution, "boom"));

        assert_eq!(reporter.request_error(), Some("Prompt is required"));
        assert_eq!(reporter.sandbox_error().map(|e| e.message.as_str()), Some("boom"));

        reporter.clear_sandbox();
        assert_eq!(reporter.request_error(), Some("Prompt is required"));
        assert!(reporter.sandbox_error().is_none());
    }

    #[test]
    fn test_request_phase_never_enters_sandbox_channel() {
        let mut reporter = ErrorReporter::new();
        reporter.report_sandbox(RenderError::new(RenderPhase::Request, "nope"));
        assert!(reporter.sandbox_error().is_none());
    }

    #[test]
    fn test_accept_sandbox_message() {
        let mut reporter = ErrorReporter::new();
        let payload = r#"{"source":"preview-sandbox","phase":"resolution","message":"Unable to find component."}"#;
        assert!(reporter.accept_sandbox_message(payload));
        assert_eq!(
            reporter.sandbox_error().map(|e| e.phase),
            Some(RenderPhase::Resolution)
        );
    }

    #[test]
    fn test_foreign_messages_are_ignored() {
        let mut reporter = ErrorReporter::new();
        assert!(!reporter.accept_sandbox_message(r#"{"source":"devtools","phase":"execution","message":"x"}"#));
        assert!(!reporter.accept_sandbox_message("not json"));
        assert!(reporter.sandbox_error().is_none());
    }

    #[test]
    fn test_request_error_body_shape() {
        let body = serde_json::to_value(RequestError::bad_request("Prompt is required").body()).unwrap();
        assert_eq!(body, serde_json::json!({ "errorMessage": "Prompt is required" }));
    }
}
