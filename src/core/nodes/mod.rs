pub mod factory;
pub mod library;
pub mod node;

// Re-export commonly used types
pub use factory::{NodeCatalog, NodeFactory};
pub use node::{Node, NodeIo, NodeLogic, NodeObserver};
