//! Storage implementations.
//!
//! Available backends:
//! - `FileStore` - directory tree on the local filesystem

pub mod fs;

pub use fs::FileStore;
