use crate::core::cloning::{CloneResult, SubgraphCloner};
use crate::core::connections::{ConnectionRegistry, Connector, RegistryConfig};
use crate::core::execution::{ExecutionScheduler, SchedulerConfig, SharedNodes, TickReport};
use crate::core::nodes::{Node, NodeFactory};
use crate::core::pins::{DefaultPinFactory, Pin};
use crate::core::types::NodeId;
use log::info;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;

/// Live graph container: owns the node set and wires the engine parts
/// together.
///
/// A tick on the board is the scheduler's compute phase followed by the
/// registry's propagation phase.
pub struct Board {
    nodes: SharedNodes,
    registry: Arc<ConnectionRegistry>,
    scheduler: ExecutionScheduler,
    factory: Arc<dyn NodeFactory>,
    cloner: SubgraphCloner,
    /// Held by a manual step, so the loop cannot start under it
    stepping: Mutex<()>,
}

impl Board {
    pub fn new(
        factory: Arc<dyn NodeFactory>,
        scheduler_config: SchedulerConfig,
        registry_config: RegistryConfig,
    ) -> Result<Self, String> {
        let registry = Arc::new(ConnectionRegistry::new(registry_config));
        let scheduler = ExecutionScheduler::new(scheduler_config)?;
        let cloner = SubgraphCloner::new(factory.clone(), Arc::new(DefaultPinFactory), registry.clone());

        Ok(Self {
            nodes: Arc::new(RwLock::new(Vec::new())),
            registry,
            scheduler,
            factory,
            cloner,
            stepping: Mutex::new(()),
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &ExecutionScheduler {
        &self.scheduler
    }

    pub fn cloner(&self) -> &SubgraphCloner {
        &self.cloner
    }

    /// Add a node built elsewhere
    pub fn add_node(&self, node: Node) -> Arc<Node> {
        let node = Arc::new(node);
        self.nodes.write().push(node.clone());
        node
    }

    /// Instantiate a node of `kind` from the factory and add it
    pub fn spawn_node(&self, kind: &str) -> Result<Arc<Node>, String> {
        let node = self.factory.new_instance(kind)?;
        Ok(self.add_node(node))
    }

    /// Remove a node after severing every connector touching it.
    ///
    /// Returns the node and the severed connectors, or `None` if the node is
    /// not on this board.
    pub fn remove_node(&self, id: NodeId) -> Option<(Arc<Node>, Vec<Arc<Connector>>)> {
        let mut nodes = self.nodes.write();
        let position = nodes.iter().position(|node| node.id() == id)?;
        let severed = self.registry.sever_node(&nodes[position]);
        let node = nodes.remove(position);
        Some((node, severed))
    }

    /// Put a previously removed node back with its identity intact
    pub fn restore_node(&self, node: Arc<Node>) {
        let mut nodes = self.nodes.write();
        if !nodes.iter().any(|existing| existing.id() == node.id()) {
            nodes.push(node);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        self.nodes.read().iter().find(|node| node.id() == id).cloned()
    }

    /// Snapshot of the node set
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.read().clone()
    }

    pub fn connect(&self, input: &Arc<Pin>, output: &Arc<Pin>) -> Option<Arc<Connector>> {
        self.registry.try_connect(input, output, false)
    }

    /// Run one full tick synchronously.
    ///
    /// Refused while the background loop is running, since two interleaved
    /// ticks would mix one tick's compute phase with another's propagation.
    pub fn step(&self) -> Result<TickReport, String> {
        let _stepping = self.stepping.lock();
        if self.scheduler.is_running() {
            return Err("Cannot step the board while the scheduler loop is running".to_string());
        }

        let report = self.scheduler.execute_once(&self.nodes());
        self.registry.propagate();
        Ok(report)
    }

    /// Start ticking in the background; `on_tick` runs after propagation
    pub fn start<F>(&self, mut on_tick: F) -> bool
    where
        F: FnMut(&TickReport) + Send + 'static,
    {
        let _stepping = self.stepping.lock();
        let registry = self.registry.clone();
        self.scheduler.start_loop(self.nodes.clone(), move |report| {
            registry.propagate();
            on_tick(report);
        })
    }

    pub fn stop(&self) {
        self.scheduler.stop_loop();
    }

    /// Start cloning the given nodes and the connectors wholly among them
    pub fn copy(&self, ids: &[NodeId]) {
        let wanted: HashSet<NodeId> = ids.iter().copied().collect();
        let nodes: Vec<Arc<Node>> = self
            .nodes()
            .into_iter()
            .filter(|node| wanted.contains(&node.id()))
            .collect();
        let connectors: Vec<Arc<Connector>> = self
            .registry
            .connectors()
            .into_iter()
            .filter(|c| wanted.contains(&c.output().owner()) && wanted.contains(&c.input().owner()))
            .collect();

        self.cloner.begin_clone(&nodes, &connectors);
    }

    /// Commit the pending clone onto the board.
    ///
    /// Waits for the clone, adds its nodes, registers its connectors, then
    /// prefetches another copy of the same subset for a repeated paste.
    pub fn paste(&self) -> Option<CloneResult> {
        self.cloner.await_completion();
        let result = self.cloner.take_result()?;

        let built = result.built_nodes();
        let count = built.len();
        self.nodes.write().extend(built);
        for connector in &result.connectors {
            self.registry.register_existing(connector.clone());
        }
        info!(
            "Pasted {} nodes and {} connectors",
            count,
            result.connectors.len()
        );

        self.cloner.try_begin_prefetch();
        Some(result)
    }
}
