//! Stable numbering of CDP frames.

use std::collections::HashMap;

use jobfill_protocols::FrameId;

use super::protocol::FrameTree;

/// Maps CDP frame ids to small numeric ids, stable for the life of a session.
///
/// The top document is always frame 0; other frames are numbered from 1 in
/// the order they are first seen and keep their number on later scans.
#[derive(Debug, Default)]
pub(crate) struct FrameRegistry {
    by_cdp_id: HashMap<String, FrameId>,
    cdp_ids: HashMap<FrameId, String>,
    next: u32,
}

impl FrameRegistry {
    /// Number every frame of `tree`, top first.
    pub fn scan(&mut self, tree: &FrameTree) -> Vec<FrameId> {
        let frames = tree.flatten();
        let mut ids = Vec::with_capacity(frames.len());
        for (position, frame) in frames.into_iter().enumerate() {
            let id = if position == 0 {
                self.bind(&frame.id, FrameId::TOP)
            } else {
                self.number(&frame.id)
            };
            ids.push(id);
        }
        ids
    }

    pub fn cdp_id(&self, frame: FrameId) -> Option<&str> {
        self.cdp_ids.get(&frame).map(String::as_str)
    }

    fn bind(&mut self, cdp_id: &str, frame: FrameId) -> FrameId {
        // A navigated top document gets a new CDP id but stays frame 0.
        self.cdp_ids.insert(frame, cdp_id.to_string());
        self.by_cdp_id.insert(cdp_id.to_string(), frame);
        frame
    }

    fn number(&mut self, cdp_id: &str) -> FrameId {
        if let Some(existing) = self.by_cdp_id.get(cdp_id) {
            if !existing.is_top() {
                return *existing;
            }
        }
        self.next += 1;
        let frame = FrameId(self.next);
        self.bind(cdp_id, frame)
    }
}
