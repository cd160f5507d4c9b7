//! Fan-out of one message per frame.

use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use jobfill_protocols::{FrameError, FrameId, FrameMessage, FrameTransport, TabId};

/// What happened in one frame.
#[derive(Debug)]
pub struct FrameOutcome {
    pub frame_id: FrameId,
    pub result: Result<Value, FrameError>,
}

impl FrameOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// The reply decoded as `T`; decode failures become a frame error.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        match &self.result {
            Ok(value) => serde_json::from_value(value.clone()).map_err(|e| {
                FrameError::InvalidResponse {
                    frame: self.frame_id,
                    message: e.to_string(),
                }
            }),
            Err(e) => Err(FrameError::Unreachable {
                frame: self.frame_id,
                message: e.to_string(),
            }),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.result.as_ref().err().map(ToString::to_string)
    }
}

/// Delivers a per-frame message to every frame of a tab.
#[derive(Clone)]
pub struct FrameBroadcastChannel {
    transport: Arc<dyn FrameTransport>,
}

impl FrameBroadcastChannel {
    pub fn new(transport: Arc<dyn FrameTransport>) -> Self {
        Self { transport }
    }

    /// Send `build(frame)` to each frame and wait for all of them.
    ///
    /// Enumeration failure degrades to the top frame. A frame without a
    /// listener gets the collaborator injected and one more delivery; any
    /// remaining failure is recorded in that frame's outcome.
    pub async fn send_to_all_frames<F>(&self, tab: &TabId, build: F) -> Vec<FrameOutcome>
    where
        F: Fn(FrameId) -> FrameMessage,
    {
        let frames = self.frames_or_top(tab).await;
        debug!("Broadcasting to {} frame(s) of tab {}", frames.len(), tab);

        let sends = frames.into_iter().map(|frame| {
            let message = build(frame);
            async move {
                let result = self.deliver_with_reinject(tab, frame, &message).await;
                if let Err(e) = &result {
                    warn!("{} failed in frame {}: {}", message.kind(), frame, e);
                }
                FrameOutcome {
                    frame_id: frame,
                    result,
                }
            }
        });

        join_all(sends).await
    }

    async fn frames_or_top(&self, tab: &TabId) -> Vec<FrameId> {
        match self.transport.frames(tab).await {
            Ok(frames) if !frames.is_empty() => {
                let mut unique = Vec::with_capacity(frames.len());
                for frame in frames {
                    if !unique.contains(&frame) {
                        unique.push(frame);
                    }
                }
                unique
            }
            Ok(_) => {
                debug!("Tab {} reported no frames, using top frame", tab);
                vec![FrameId::TOP]
            }
            Err(e) => {
                warn!("Frame enumeration failed for tab {}: {}, using top frame", tab, e);
                vec![FrameId::TOP]
            }
        }
    }

    async fn deliver_with_reinject(
        &self,
        tab: &TabId,
        frame: FrameId,
        message: &FrameMessage,
    ) -> Result<Value, FrameError> {
        match self.transport.deliver(tab, frame, message).await {
            Err(e) if e.is_missing_listener() => {
                debug!("No listener in frame {}, injecting collaborator", frame);
                self.transport.inject(tab, frame).await?;
                self.transport.deliver(tab, frame, message).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
