//! Shared primitives for the studio bridge workspace.
//!
//! Everything here is dependency-light so that every other crate
//! (`models`, `bridge-core`, `bridge-mock`, the host app) can use it:
//!
//! - [`ErrorLocation`]: call-site capture used by every error enum
//! - [`HttpStatusCode`]: status carried by operation errors across the bridge

pub mod error;
pub mod http_status;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;

#[cfg(test)]
mod tests;
