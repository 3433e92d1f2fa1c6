//! Topology-preserving duplication of a node subset (copy/paste).

use crate::core::connections::{ConnectionRegistry, Connector};
use crate::core::nodes::{Node, NodeFactory};
use crate::core::pins::{Pin, PinFactory};
use crate::core::types::PinId;
use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Nodes and connectors produced by one clone run
#[derive(Debug, Clone, Default)]
pub struct CloneResult {
    /// Fresh nodes by source position; `None` where the kind could not be built
    pub nodes: Vec<Option<Arc<Node>>>,
    /// Unregistered connectors between the fresh nodes
    pub connectors: Vec<Arc<Connector>>,
    /// Source nodes whose kind could not be instantiated
    pub skipped_nodes: usize,
    /// Source connectors that could not be replicated
    pub skipped_connectors: usize,
}

impl CloneResult {
    /// The nodes that were built, in source order
    pub fn built_nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.iter().flatten().cloned().collect()
    }
}

/// The captured subset a clone run reads from
struct CloneSource {
    nodes: Vec<Arc<Node>>,
    connectors: Vec<Arc<Connector>>,
}

#[derive(Default)]
struct ClonerState {
    source: Option<Arc<CloneSource>>,
    task: Option<JoinHandle<CloneResult>>,
    /// A waiter has taken `task` and is joining it outside the lock
    joining: bool,
    result: Option<CloneResult>,
}

impl ClonerState {
    fn in_flight(&self) -> bool {
        self.joining || self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn has_outstanding(&self) -> bool {
        self.joining || self.task.is_some()
    }
}

/// Clones node subsets on a background thread.
///
/// At most one clone task runs at a time. Results become visible only after
/// [`await_completion`](Self::await_completion); while a task is outstanding
/// the accessors return empty lists.
pub struct SubgraphCloner {
    node_factory: Arc<dyn NodeFactory>,
    pin_factory: Arc<dyn PinFactory>,
    registry: Arc<ConnectionRegistry>,
    state: Mutex<ClonerState>,
    joined: Condvar,
}

impl SubgraphCloner {
    pub fn new(
        node_factory: Arc<dyn NodeFactory>,
        pin_factory: Arc<dyn PinFactory>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            node_factory,
            pin_factory,
            registry,
            state: Mutex::new(ClonerState::default()),
            joined: Condvar::new(),
        }
    }

    /// Start cloning `nodes` and the `connectors` among them.
    ///
    /// The subset is captured by reference; the caller must not mutate it
    /// until the clone completes. Any unconsumed result is discarded, and an
    /// outstanding task is waited out and its result dropped.
    pub fn begin_clone(&self, nodes: &[Arc<Node>], connectors: &[Arc<Connector>]) {
        let mut state = self.state.lock();
        self.wait_for_waiters(&mut state);
        if let Some(task) = state.task.take() {
            debug!("Discarding outstanding clone before starting a new one");
            let _ = task.join();
        }
        state.result = None;

        let source = Arc::new(CloneSource {
            nodes: nodes.to_vec(),
            connectors: connectors.to_vec(),
        });
        state.source = Some(source.clone());
        self.launch(&mut state, source);
    }

    /// Restart cloning of the last captured subset, to pre-warm a repeated
    /// paste. Returns `false` and changes nothing if a clone is running or no
    /// subset was ever captured.
    pub fn try_begin_prefetch(&self) -> bool {
        let mut state = self.state.lock();
        if state.in_flight() {
            return false;
        }
        let Some(source) = state.source.clone() else {
            return false;
        };

        if let Some(task) = state.task.take() {
            let _ = task.join();
        }
        state.result = None;
        self.launch(&mut state, source);
        true
    }

    /// Wait for the outstanding clone, if any, and publish its result.
    ///
    /// The join happens outside the lock, so other callers keep seeing the
    /// clone as in flight until the result is published.
    pub fn await_completion(&self) {
        let mut state = self.state.lock();
        self.wait_for_waiters(&mut state);
        let Some(task) = state.task.take() else {
            return;
        };

        state.joining = true;
        let joined = MutexGuard::unlocked(&mut state, || task.join());
        state.result = Some(joined.unwrap_or_else(|_| {
            error!("Clone task panicked; no nodes were cloned");
            CloneResult::default()
        }));
        state.joining = false;
        self.joined.notify_all();
    }

    fn wait_for_waiters(&self, state: &mut MutexGuard<'_, ClonerState>) {
        while state.joining {
            self.joined.wait(state);
        }
    }

    /// Check if a clone task is currently running
    pub fn is_cloning(&self) -> bool {
        self.state.lock().in_flight()
    }

    /// Cloned nodes of the completed run by source position, empty while a
    /// run is outstanding
    pub fn cloned_nodes(&self) -> Vec<Option<Arc<Node>>> {
        let state = self.state.lock();
        match &state.result {
            Some(result) if !state.has_outstanding() => result.nodes.clone(),
            _ => Vec::new(),
        }
    }

    /// Cloned connectors of the completed run, empty while a run is outstanding
    pub fn cloned_connectors(&self) -> Vec<Arc<Connector>> {
        let state = self.state.lock();
        match &state.result {
            Some(result) if !state.has_outstanding() => result.connectors.clone(),
            _ => Vec::new(),
        }
    }

    /// Consume the completed result
    pub fn take_result(&self) -> Option<CloneResult> {
        let mut state = self.state.lock();
        if state.has_outstanding() {
            return None;
        }
        state.result.take()
    }

    fn launch(&self, state: &mut ClonerState, source: Arc<CloneSource>) {
        let node_factory = self.node_factory.clone();
        let pin_factory = self.pin_factory.clone();
        let registry = self.registry.clone();
        let task_source = source.clone();

        let spawned = thread::Builder::new()
            .name("boardsim-cloner".to_string())
            .spawn(move || {
                clone_subgraph(&task_source, node_factory.as_ref(), pin_factory.as_ref(), &registry)
            });

        match spawned {
            Ok(handle) => state.task = Some(handle),
            Err(e) => {
                warn!("Failed to spawn clone task ({}); cloning inline", e);
                state.result = Some(clone_subgraph(
                    &source,
                    self.node_factory.as_ref(),
                    self.pin_factory.as_ref(),
                    &self.registry,
                ));
            }
        }
    }
}

/// Build the clone of `source`.
///
/// Clones correspond to sources by position, not identity: a connector is
/// replicated by locating its endpoints' positions in the flattened source
/// pin lists and joining the clone pins found at the same positions.
fn clone_subgraph(
    source: &CloneSource,
    node_factory: &dyn NodeFactory,
    pin_factory: &dyn PinFactory,
    registry: &ConnectionRegistry,
) -> CloneResult {
    let mut result = CloneResult::default();

    let clones: Vec<Option<Arc<Node>>> = source
        .nodes
        .iter()
        .map(|original| match node_factory.new_instance(original.kind()) {
            Ok(node) => {
                for pin in original.inputs().iter().skip(node.input_count()) {
                    node.add_input(pin_factory, pin.value_type());
                }
                Some(Arc::new(node))
            }
            Err(e) => {
                warn!("Skipping {} while cloning: {}", original.id(), e);
                result.skipped_nodes += 1;
                None
            }
        })
        .collect();

    let mut input_positions: HashMap<PinId, usize> = HashMap::new();
    let mut output_positions: HashMap<PinId, usize> = HashMap::new();
    let mut cloned_inputs: Vec<Option<Arc<Pin>>> = Vec::new();
    let mut cloned_outputs: Vec<Option<Arc<Pin>>> = Vec::new();

    for (original, clone) in source.nodes.iter().zip(&clones) {
        for (index, pin) in original.inputs().iter().enumerate() {
            input_positions.insert(pin.id(), cloned_inputs.len());
            cloned_inputs.push(clone.as_ref().and_then(|c| c.input(index)));
        }
        for (index, pin) in original.outputs().iter().enumerate() {
            output_positions.insert(pin.id(), cloned_outputs.len());
            cloned_outputs.push(clone.as_ref().and_then(|c| c.output(index)));
        }
    }

    for connector in &source.connectors {
        let input = input_positions
            .get(&connector.input().id())
            .and_then(|&position| cloned_inputs[position].as_ref());
        let output = output_positions
            .get(&connector.output().id())
            .and_then(|&position| cloned_outputs[position].as_ref());

        let (Some(input), Some(output)) = (input, output) else {
            warn!("Skipping {} while cloning: endpoint has no clone counterpart", connector.id());
            result.skipped_connectors += 1;
            continue;
        };

        match registry.try_connect(input, output, true) {
            Some(cloned) => result.connectors.push(cloned),
            None => {
                warn!("Skipping {} while cloning: cloned pins refused the connection", connector.id());
                result.skipped_connectors += 1;
            }
        }
    }

    result.nodes = clones;
    debug!(
        "Cloned {} nodes and {} connectors ({} nodes, {} connectors skipped)",
        result.nodes.len() - result.skipped_nodes,
        result.connectors.len(),
        result.skipped_nodes,
        result.skipped_connectors
    );
    result
}
