pub mod backend;
pub mod bridge;
pub mod call;
pub mod config;
pub mod operation;
pub mod registry;
pub mod transport;

pub use backend::BackendError;
pub use bridge::BridgeError;
pub use call::CallError;
pub use config::ConfigError;
pub use operation::OperationError;
pub use registry::RegistryError;
pub use transport::TransportError;
