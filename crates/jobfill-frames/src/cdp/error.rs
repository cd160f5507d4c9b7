//! CDP error types.

use thiserror::Error;

use jobfill_protocols::{FrameError, FrameId};

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not found or not running with remote debugging.
    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CdpError {
    /// Attribute this error to `frame`.
    pub fn into_frame_error(self, frame: FrameId) -> FrameError {
        match self {
            CdpError::JavaScript(message) | CdpError::InvalidResponse(message) => {
                FrameError::InvalidResponse { frame, message }
            }
            CdpError::Protocol { message, .. } => FrameError::Unreachable { frame, message },
            other => FrameError::Transport(other.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = CdpError::Protocol {
            code: -32000,
            message: "No frame with given id found".to_string(),
        };
        assert!(err.to_string().contains("-32000"));
    }

    #[test]
    fn test_into_frame_error() {
        let err = CdpError::JavaScript("boom".to_string()).into_frame_error(FrameId(2));
        assert!(matches!(err, FrameError::InvalidResponse { frame: FrameId(2), .. }));

        let err = CdpError::SessionClosed.into_frame_error(FrameId(0));
        assert!(matches!(err, FrameError::Transport(_)));
    }
}
