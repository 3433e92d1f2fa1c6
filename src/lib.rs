//! Dataflow engine for simulated circuit boards.
//!
//! Nodes expose typed input and output pins, connectors carry values from
//! outputs to inputs, and the scheduler advances the whole graph in discrete
//! ticks. See [`core::board::Board`] for the container that ties the parts
//! together.

pub mod core;

// Re-export commonly used types
pub use crate::core::board::Board;
pub use crate::core::cloning::{CloneResult, SubgraphCloner};
pub use crate::core::connections::{ConnectionRegistry, Connector, RegistryConfig, SelfLoopPolicy};
pub use crate::core::execution::{ConcurrencyMode, ExecutionScheduler, SchedulerConfig, TickReport};
pub use crate::core::layout::ConnectorLayoutResolver;
pub use crate::core::nodes::{Node, NodeCatalog, NodeFactory, NodeIo, NodeLogic};
pub use crate::core::pins::{Pin, PinFactory};
pub use crate::core::types::{ConnectorId, NodeId, PinId, PinKind};
pub use crate::core::values::{TypeTag, TypedValue};
