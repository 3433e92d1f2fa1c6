use super::compatibility::{ExactTypeMatch, TypeCompatibility};
use super::config::RegistryConfig;
use super::connection_validator::ConnectionValidator;
use super::connector::Connector;
use crate::core::nodes::Node;
use crate::core::pins::Pin;
use crate::core::types::{ConnectorId, PinId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct RegistryState {
    /// Registered connectors by identity
    connectors: HashMap<ConnectorId, Arc<Connector>>,
    /// Registration order, for stable snapshots
    order: Vec<ConnectorId>,
    /// Reverse mapping: input pin -> the one connector driving it
    input_sources: HashMap<PinId, ConnectorId>,
    /// Fan-out mapping: output pin -> connectors it drives
    output_targets: HashMap<PinId, Vec<ConnectorId>>,
}

impl RegistryState {
    fn insert(&mut self, connector: Arc<Connector>) {
        let id = connector.id();
        let input = connector.input().id();
        match self.input_sources.get(&input) {
            Some(existing) if *existing != id => {
                log::warn!(
                    "Input pin {} already driven by {}; {} registered as a second driver",
                    input,
                    existing,
                    id
                );
            }
            _ => {
                self.input_sources.insert(input, id);
            }
        }
        self.output_targets.entry(connector.output().id()).or_default().push(id);
        self.order.push(id);
        self.connectors.insert(id, connector);
    }

    fn remove(&mut self, id: ConnectorId) -> Option<Arc<Connector>> {
        let connector = self.connectors.remove(&id)?;
        self.order.retain(|existing| *existing != id);

        let input = connector.input().id();
        if self.input_sources.get(&input) == Some(&id) {
            self.input_sources.remove(&input);
            // Hand the input over to any remaining driver
            let next = self
                .order
                .iter()
                .find(|other| self.connectors.get(*other).is_some_and(|c| c.input().id() == input))
                .copied();
            if let Some(next) = next {
                self.input_sources.insert(input, next);
            }
        }

        let output = connector.output().id();
        if let Some(targets) = self.output_targets.get_mut(&output) {
            targets.retain(|existing| *existing != id);
            if targets.is_empty() {
                self.output_targets.remove(&output);
            }
        }
        Some(connector)
    }
}

/// Authoritative set of live connectors on a board.
///
/// The registry is the only place connectors are created or destroyed.
/// Mutations are serialized behind a write lock; queries share a read lock.
/// Expected refusals (type mismatch, occupied input, unknown connector) are
/// reported as `false`/`None`, never as panics.
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
    checker: Box<dyn TypeCompatibility>,
    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a registry using exact type matching
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_checker(config, ExactTypeMatch)
    }

    /// Create a registry with a custom type compatibility check
    pub fn with_checker(config: RegistryConfig, checker: impl TypeCompatibility + 'static) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            checker: Box::new(checker),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Explain why `output` cannot drive `input`, or `Ok` if it can
    pub fn check_connection(&self, input: &Pin, output: &Pin) -> Result<(), String> {
        let state = self.state.read();
        ConnectionValidator::validate_connection(
            self.checker.as_ref(),
            self.config.self_loop_policy,
            &state.input_sources,
            input,
            output,
        )
    }

    /// Check if `output` may drive `input` right now
    pub fn is_connectable(&self, input: &Pin, output: &Pin) -> bool {
        self.check_connection(input, output).is_ok()
    }

    /// Check if `pin` is an endpoint of any registered connector
    pub fn has_connection(&self, pin: &Pin) -> bool {
        let state = self.state.read();
        state.input_sources.contains_key(&pin.id()) || state.output_targets.contains_key(&pin.id())
    }

    /// Create a connector from `output` to `input`.
    ///
    /// With `skip_registration` the connector is built but not added, so the
    /// caller can decide later whether to [`register_existing`](Self::register_existing) it.
    pub fn try_connect(&self, input: &Arc<Pin>, output: &Arc<Pin>, skip_registration: bool) -> Option<Arc<Connector>> {
        let mut state = self.state.write();

        if let Err(reason) = ConnectionValidator::validate_connection(
            self.checker.as_ref(),
            self.config.self_loop_policy,
            &state.input_sources,
            input,
            output,
        ) {
            log::debug!("Connection refused: {}", reason);
            return None;
        }

        let connector = Arc::new(Connector::new(output.clone(), input.clone()).ok()?);
        if !skip_registration {
            state.insert(connector.clone());
        }
        Some(connector)
    }

    /// Add an already constructed connector, keeping its identity.
    ///
    /// No validation is done; the caller guarantees the connector is sound.
    pub fn register_existing(&self, connector: Arc<Connector>) {
        let mut state = self.state.write();
        if state.connectors.contains_key(&connector.id()) {
            return;
        }
        state.insert(connector);
    }

    /// Remove a connector, returns whether it was registered
    pub fn try_remove(&self, connector: &Connector) -> bool {
        self.state.write().remove(connector.id()).is_some()
    }

    /// Remove every connector touching a pin of `node`.
    ///
    /// Call this before discarding a node. The removed connectors are
    /// returned so they can be re-registered (e.g. by undo).
    pub fn sever_node(&self, node: &Node) -> Vec<Arc<Connector>> {
        let pins: HashSet<PinId> = node
            .inputs()
            .iter()
            .chain(node.outputs().iter())
            .map(|pin| pin.id())
            .collect();

        let mut state = self.state.write();
        let doomed: Vec<ConnectorId> = state
            .order
            .iter()
            .filter(|id| {
                state.connectors.get(*id).is_some_and(|c| {
                    pins.contains(&c.input().id()) || pins.contains(&c.output().id())
                })
            })
            .copied()
            .collect();

        doomed.into_iter().filter_map(|id| state.remove(id)).collect()
    }

    /// Check if this exact connector is registered
    pub fn contains(&self, connector: &Connector) -> bool {
        self.state.read().connectors.contains_key(&connector.id())
    }

    /// Snapshot of all registered connectors in registration order
    pub fn connectors(&self) -> Vec<Arc<Connector>> {
        let state = self.state.read();
        state.order.iter().filter_map(|id| state.connectors.get(id).cloned()).collect()
    }

    /// Connectors driven by `output`
    pub fn connectors_from(&self, output: &Pin) -> Vec<Arc<Connector>> {
        let state = self.state.read();
        state
            .output_targets
            .get(&output.id())
            .map(|ids| ids.iter().filter_map(|id| state.connectors.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// The connector driving `input`, if any
    pub fn connector_into(&self, input: &Pin) -> Option<Arc<Connector>> {
        let state = self.state.read();
        state
            .input_sources
            .get(&input.id())
            .and_then(|id| state.connectors.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.state.read().connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy every connector's output value into its input pin.
    ///
    /// This is the propagation half of a tick; run it only after all nodes
    /// finished computing. Returns how many inputs changed.
    pub fn propagate(&self) -> usize {
        let mut changed = 0;
        for connector in self.connectors() {
            match connector.transfer() {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Propagation over {} failed: {}", connector.id(), e),
            }
        }
        changed
    }

    /// Get connection statistics
    pub fn stats(&self) -> ConnectionStats {
        let state = self.state.read();
        ConnectionStats {
            connectors: state.connectors.len(),
            driven_inputs: state.input_sources.len(),
            driving_outputs: state.output_targets.len(),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Connection statistics for debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub connectors: usize,
    pub driven_inputs: usize,
    pub driving_outputs: usize,
}
