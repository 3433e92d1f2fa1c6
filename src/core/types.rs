use uuid::Uuid;

/// Unique identifier of a node instance on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a fresh, random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the raw UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Unique identifier of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(Uuid);

impl PinId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pin-{}", self.0)
    }
}

/// Identity of a connector.
///
/// A connector keeps its ID across remove/re-register cycles, so undo history
/// and snapshots can refer to the same edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(Uuid);

impl ConnectorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connector-{}", self.0)
    }
}

/// Direction of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PinKind {
    /// Receives a value from exactly one connector
    Input,
    /// Drives zero or many connectors
    Output,
}

impl PinKind {
    /// Check if a pin of this kind can drive a pin of the other kind
    pub fn can_connect_to(&self, other: &PinKind) -> bool {
        matches!((self, other), (PinKind::Output, PinKind::Input))
    }
}

impl std::fmt::Display for PinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinKind::Input => write!(f, "input"),
            PinKind::Output => write!(f, "output"),
        }
    }
}
