use crate::core::pins::{Pin, PinFactory};
use crate::core::types::{NodeId, PinKind};
use crate::core::values::{PinData, TypeTag, TypedValue};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Behaviour of a node kind.
///
/// `execute` reads the node's own input pins and writes its own output pins
/// through [`NodeIo`]. It must not reach other nodes: values travel between
/// nodes only through connectors, in a separate propagation phase.
pub trait NodeLogic: Send {
    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<(), String>;
}

impl<F> NodeLogic for F
where
    F: FnMut(&mut NodeIo<'_>) -> Result<(), String> + Send,
{
    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<(), String> {
        self(io)
    }
}

/// Observer notified when a node's outputs change after execution
pub trait NodeObserver: Send + Sync {
    fn on_outputs_changed(&self, node_id: NodeId);
}

/// View of a node's pins handed to [`NodeLogic::execute`]
pub struct NodeIo<'a> {
    node_id: NodeId,
    inputs: &'a [Arc<Pin>],
    outputs: &'a [Arc<Pin>],
    changed: bool,
}

impl<'a> NodeIo<'a> {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Read input `index` as `T`
    pub fn input<T: PinData>(&self, index: usize) -> Result<T, String> {
        self.inputs
            .get(index)
            .ok_or_else(|| format!("Input {} not found on {}", index, self.node_id))?
            .get::<T>()
    }

    /// Read every input as `T`, in pin order
    pub fn inputs<T: PinData>(&self) -> Result<Vec<T>, String> {
        self.inputs.iter().map(|pin| pin.get::<T>()).collect()
    }

    /// Read input `index` without knowing its type
    pub fn input_value(&self, index: usize) -> Result<TypedValue, String> {
        self.inputs
            .get(index)
            .map(|pin| pin.value())
            .ok_or_else(|| format!("Input {} not found on {}", index, self.node_id))
    }

    /// Write output `index`
    pub fn set_output<T: PinData>(&mut self, index: usize, value: T) -> Result<(), String> {
        let pin = self
            .outputs
            .get(index)
            .ok_or_else(|| format!("Output {} not found on {}", index, self.node_id))?;
        self.changed |= pin.set(value)?;
        Ok(())
    }
}

/// A component instance on the board.
///
/// Inputs can grow (append only) but never shrink or reorder; outputs are
/// fixed when the node is built.
pub struct Node {
    id: NodeId,
    kind: String,
    inputs: RwLock<Vec<Arc<Pin>>>,
    outputs: Vec<Arc<Pin>>,
    logic: Mutex<Box<dyn NodeLogic>>,
    observers: RwLock<Vec<Arc<dyn NodeObserver>>>,
}

impl Node {
    /// Build a node with fresh pins of the given types
    pub fn new(
        kind: impl Into<String>,
        inputs: &[TypeTag],
        outputs: &[TypeTag],
        logic: impl NodeLogic + 'static,
    ) -> Self {
        let id = NodeId::new();
        let inputs = inputs
            .iter()
            .enumerate()
            .map(|(index, tag)| Arc::new(Pin::new(id, PinKind::Input, index, *tag)))
            .collect();
        let outputs = outputs
            .iter()
            .enumerate()
            .map(|(index, tag)| Arc::new(Pin::new(id, PinKind::Output, index, *tag)))
            .collect();

        Self {
            id,
            kind: kind.into(),
            inputs: RwLock::new(inputs),
            outputs,
            logic: Mutex::new(Box::new(logic)),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the node kind this instance was built from
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Snapshot of the input pins
    pub fn inputs(&self) -> Vec<Arc<Pin>> {
        self.inputs.read().clone()
    }

    pub fn input(&self, index: usize) -> Option<Arc<Pin>> {
        self.inputs.read().get(index).cloned()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.read().len()
    }

    pub fn outputs(&self) -> &[Arc<Pin>] {
        &self.outputs
    }

    pub fn output(&self, index: usize) -> Option<Arc<Pin>> {
        self.outputs.get(index).cloned()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Check if `pin` belongs to this node
    pub fn owns(&self, pin: &Pin) -> bool {
        pin.owner() == self.id
    }

    /// Append a new input pin created by `factory`
    pub fn add_input(&self, factory: &dyn PinFactory, value_type: TypeTag) -> Arc<Pin> {
        let mut inputs = self.inputs.write();
        let pin = factory.create_pin(self.id, PinKind::Input, inputs.len(), value_type);
        inputs.push(pin.clone());
        pin
    }

    /// Register an observer for output changes
    pub fn subscribe(&self, observer: Arc<dyn NodeObserver>) {
        self.observers.write().push(observer);
    }

    /// Compute new outputs from the current inputs.
    ///
    /// Returns whether any output value changed. Observers are notified only
    /// on a successful, changing execution.
    pub fn execute(&self) -> Result<bool, String> {
        let inputs = self.inputs.read();
        let mut io = NodeIo {
            node_id: self.id,
            inputs: &inputs,
            outputs: &self.outputs,
            changed: false,
        };

        self.logic.lock().execute(&mut io)?;
        let changed = io.changed;
        drop(inputs);

        if changed {
            for observer in self.observers.read().iter() {
                observer.on_outputs_changed(self.id);
            }
        }
        Ok(changed)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("inputs", &self.input_count())
            .field("outputs", &self.output_count())
            .finish()
    }
}
