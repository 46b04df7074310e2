//! Core traits for the sync pipeline.
//!
//! - `PageSource`: acquire the remote page (HTTP, mock)
//! - `CaptureStore`: persist captures, history and conversion output

pub mod source;
pub mod store;

pub use source::PageSource;
pub use store::{format_bytes, CaptureStore, FingerprintEntry, HashStatistics, StorageUsage};
