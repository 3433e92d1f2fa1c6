use crate::core::pins::Pin;
use crate::core::types::{ConnectorId, PinKind};
use std::sync::Arc;

/// A directed edge from one output pin to one input pin
pub struct Connector {
    id: ConnectorId,
    output: Arc<Pin>,
    input: Arc<Pin>,
}

impl Connector {
    /// Create a connector between two pins.
    ///
    /// Only checks pin directions; type and occupancy rules belong to
    /// [`ConnectionRegistry`](super::ConnectionRegistry).
    pub fn new(output: Arc<Pin>, input: Arc<Pin>) -> Result<Self, String> {
        if output.kind() != PinKind::Output {
            return Err(format!("Connector source {} is an {} pin", output.id(), output.kind()));
        }
        if input.kind() != PinKind::Input {
            return Err(format!("Connector target {} is an {} pin", input.id(), input.kind()));
        }

        Ok(Self {
            id: ConnectorId::new(),
            output,
            input,
        })
    }

    pub fn id(&self) -> ConnectorId {
        self.id
    }

    pub fn output(&self) -> &Arc<Pin> {
        &self.output
    }

    pub fn input(&self) -> &Arc<Pin> {
        &self.input
    }

    /// Check if both endpoints belong to the same node
    pub fn is_self_connecting(&self) -> bool {
        self.output.owner() == self.input.owner()
    }

    /// Check if `pin` is one of the endpoints
    pub fn touches(&self, pin: &Pin) -> bool {
        self.output.id() == pin.id() || self.input.id() == pin.id()
    }

    /// Copy the output value into the input pin
    pub fn transfer(&self) -> Result<bool, String> {
        self.input.set_value(self.output.value())
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("id", &self.id)
            .field("output", &self.output.id())
            .field("input", &self.input.id())
            .finish()
    }
}
