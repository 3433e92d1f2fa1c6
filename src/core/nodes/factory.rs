use super::node::Node;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of fresh node instances, keyed by kind name.
///
/// This is the boundary to plugin discovery: the engine never inspects how
/// kinds are found, it only asks for a new instance.
pub trait NodeFactory: Send + Sync {
    fn new_instance(&self, kind: &str) -> Result<Node, String>;
}

type NodeConstructor = Arc<dyn Fn() -> Node + Send + Sync>;

/// Manages registration of node kinds and builds instances of them
#[derive(Default, Clone)]
pub struct NodeCatalog {
    constructors: HashMap<String, NodeConstructor>,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Catalog pre-populated with the built-in gate kinds
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        super::library::register_builtin_nodes(&mut catalog);
        catalog
    }

    /// Register a node kind
    pub fn register<F>(&mut self, kind: &str, constructor: F) -> Result<(), String>
    where
        F: Fn() -> Node + Send + Sync + 'static,
    {
        if self.constructors.contains_key(kind) {
            return Err(format!("Node kind '{}' already registered", kind));
        }

        self.constructors.insert(kind.to_string(), Arc::new(constructor));
        Ok(())
    }

    /// Check if a node kind exists
    pub fn has_kind(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kind names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl NodeFactory for NodeCatalog {
    fn new_instance(&self, kind: &str) -> Result<Node, String> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| format!("Node kind '{}' not found. Valid kinds: {:?}", kind, self.kinds()))?;

        let node = constructor();
        if node.kind() != kind {
            return Err(format!(
                "Constructor for '{}' produced a node of kind '{}'",
                kind,
                node.kind()
            ));
        }
        Ok(node)
    }
}

impl std::fmt::Debug for NodeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCatalog").field("kinds", &self.kinds()).finish()
    }
}
