//! Frame delivery errors.

use thiserror::Error;

use crate::types::FrameId;

#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame exists but nothing in it answers messages yet.
    #[error("No listener in frame {0}")]
    NoListener(FrameId),

    #[error("Frame {frame} unreachable: {message}")]
    Unreachable { frame: FrameId, message: String },

    #[error("Frame enumeration failed: {0}")]
    Enumeration(String),

    #[error("Script injection into frame {frame} failed: {message}")]
    Injection { frame: FrameId, message: String },

    #[error("Invalid response from frame {frame}: {message}")]
    InvalidResponse { frame: FrameId, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl FrameError {
    /// Whether re-injecting the collaborator could make a retry succeed.
    pub fn is_missing_listener(&self) -> bool {
        matches!(self, FrameError::NoListener(_))
    }
}
