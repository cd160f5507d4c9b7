//! Chrome DevTools Protocol (CDP) frame transport.
//!
//! Connects to a Chrome started with remote debugging:
//!
//! ```bash
//! chrome --remote-debugging-port=9222
//! ```
//!
//! and reaches the collaborator in each frame through a per-frame isolated
//! world:
//!
//! ```rust,ignore
//! let client = Arc::new(CdpClient::connect("http://localhost:9222").await?);
//! let transport = CdpFrameTransport::new(client.clone(), scripts);
//! let sync = CdpSessionSync::new(client, "https://app.example.com", "accessToken");
//! ```

mod client;
mod error;
mod protocol;
mod registry;
mod session_sync;
mod transport;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session_sync::CdpSessionSync;
pub use transport::{load_scripts, CdpFrameTransport};
