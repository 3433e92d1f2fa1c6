use super::pin::Pin;
use crate::core::types::{NodeId, PinKind};
use crate::core::values::TypeTag;
use std::sync::Arc;

/// Capability for creating pins on demand.
///
/// The subgraph cloner uses it to grow a fresh node's input list to the size
/// of its source.
pub trait PinFactory: Send + Sync {
    fn create_pin(&self, owner: NodeId, kind: PinKind, index: usize, value_type: TypeTag) -> Arc<Pin>;
}

/// Creates plain pins holding the default value of their type
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPinFactory;

impl PinFactory for DefaultPinFactory {
    fn create_pin(&self, owner: NodeId, kind: PinKind, index: usize, value_type: TypeTag) -> Arc<Pin> {
        Arc::new(Pin::new(owner, kind, index, value_type))
    }
}
