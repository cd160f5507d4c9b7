//! Data model types.

mod context;
mod field;
mod frame;
mod mapping;
mod serde_util;

pub use context::*;
pub use field::*;
pub use frame::*;
pub use mapping::*;

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
