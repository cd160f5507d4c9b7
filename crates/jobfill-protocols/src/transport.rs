//! Per-frame message transport.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FrameError;
use crate::message::FrameMessage;
use crate::types::{FrameId, TabId};

/// Reaches the in-page collaborator of individual frames of a tab.
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// All frames of the tab, top document first.
    async fn frames(&self, tab: &TabId) -> Result<Vec<FrameId>, FrameError>;

    /// Deliver one message and return the collaborator's reply.
    ///
    /// Fails with [`FrameError::NoListener`] when the collaborator is not
    /// loaded in that frame.
    async fn deliver(
        &self,
        tab: &TabId,
        frame: FrameId,
        message: &FrameMessage,
    ) -> Result<Value, FrameError>;

    /// Load the collaborator scripts into exactly this frame.
    async fn inject(&self, tab: &TabId, frame: FrameId) -> Result<(), FrameError>;
}
