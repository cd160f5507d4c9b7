//! # jobfill frames
//!
//! Delivers messages to the in-page collaborator of every frame of a tab.
//!
//! [`FrameBroadcastChannel`] fans a message out to all frames concurrently,
//! re-injecting the collaborator once where nothing is listening, and reports
//! one [`FrameOutcome`] per frame. [`cdp::CdpFrameTransport`] is the transport
//! used against a real browser, and [`cdp::CdpSessionSync`] shares the bearer
//! token with web-app tabs open in it.

mod broadcast;
pub mod cdp;

pub use broadcast::{FrameBroadcastChannel, FrameOutcome};
