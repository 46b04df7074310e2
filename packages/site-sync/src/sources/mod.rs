//! Page source implementations.
//!
//! - `HttpPageSource` - plain HTTP fetch with inline and linked stylesheets
//! - `MockPageSource` - canned pages for tests

pub mod http;
pub mod mock;

pub use http::HttpPageSource;
pub use mock::{MockFailure, MockPageSource};
