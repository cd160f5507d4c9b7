//! Error types shared across collaborator boundaries.

mod credential;
mod frame;
mod storage;

pub use credential::*;
pub use frame::*;
pub use storage::*;
