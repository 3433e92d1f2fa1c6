pub mod compatibility;
pub mod config;
pub mod connection_validator;
pub mod connector;
pub mod registry;

// Re-export commonly used types
pub use compatibility::{ExactTypeMatch, TypeCompatibility};
pub use config::{RegistryConfig, SelfLoopPolicy};
pub use connection_validator::ConnectionValidator;
pub use connector::Connector;
pub use registry::{ConnectionRegistry, ConnectionStats};
