use crate::core::types::{NodeId, PinId, PinKind};
use crate::core::values::{PinData, TypeTag, TypedValue};
use parking_lot::RwLock;

/// A typed terminal on a node.
///
/// A pin belongs to exactly one node for its whole lifetime and holds the
/// current value flowing through it. `index` is its position in the owner's
/// input or output list.
pub struct Pin {
    id: PinId,
    owner: NodeId,
    kind: PinKind,
    index: usize,
    value_type: TypeTag,
    value: RwLock<TypedValue>,
}

impl Pin {
    /// Create a pin holding the default value of its type
    pub fn new(owner: NodeId, kind: PinKind, index: usize, value_type: TypeTag) -> Self {
        Self {
            id: PinId::new(),
            owner,
            kind,
            index,
            value: RwLock::new(value_type.default_value()),
            value_type,
        }
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    /// ID of the node this pin belongs to
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn kind(&self) -> PinKind {
        self.kind
    }

    /// Position of this pin in its owner's input or output list
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value_type(&self) -> TypeTag {
        self.value_type
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, PinKind::Input)
    }

    pub fn is_output(&self) -> bool {
        matches!(self.kind, PinKind::Output)
    }

    /// Snapshot of the current value
    pub fn value(&self) -> TypedValue {
        self.value.read().clone()
    }

    /// Read the current value as `T`
    pub fn get<T: PinData>(&self) -> Result<T, String> {
        self.value.read().get::<T>().cloned()
    }

    /// Replace the current value, returns whether it changed
    pub fn set_value(&self, value: TypedValue) -> Result<bool, String> {
        if value.tag() != self.value_type {
            return Err(format!(
                "Cannot store {} in {} pin {} of type {}",
                value.type_name(),
                self.kind,
                self.id,
                self.value_type
            ));
        }

        let mut current = self.value.write();
        if *current == value {
            return Ok(false);
        }
        *current = value;
        Ok(true)
    }

    /// Write a typed value, returns whether it changed
    pub fn set<T: PinData>(&self, value: T) -> Result<bool, String> {
        self.set_value(TypedValue::new(value))
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pin")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("value_type", &self.value_type)
            .field("value", &*self.value.read())
            .finish()
    }
}
