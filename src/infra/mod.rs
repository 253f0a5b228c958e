//! Infrastructure adapters for storage backends.

pub mod cache;

pub use cache::{Cache, Cached, FileCache, MemoryCache};
