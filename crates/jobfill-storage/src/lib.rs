//! # jobfill storage
//!
//! Durable key/value storage backends.
//!
//! - [`MemoryStore`] keeps everything in process memory (tests, dry runs).
//! - [`JsonFileStore`] keeps one JSON document on disk, rewritten whole on every write.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
