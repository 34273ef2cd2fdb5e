// Library exports for testing
// The binary (main.rs) imports these as well

pub mod endpoint;
pub mod error;
pub mod host;
pub mod logger;
