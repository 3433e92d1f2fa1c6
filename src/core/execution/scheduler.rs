use super::config::{clamp_rate, ConcurrencyMode, SchedulerConfig};
use crate::core::nodes::Node;
use crate::core::types::NodeId;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Node set shared with the host; the loop re-reads it before every tick
pub type SharedNodes = Arc<RwLock<Vec<Arc<Node>>>>;

/// A node whose `execute()` failed or panicked during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFault {
    pub node_id: NodeId,
    pub kind: String,
    pub message: String,
}

impl std::fmt::Display for NodeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) failed: {}", self.node_id, self.kind, self.message)
    }
}

/// Outcome of one compute phase
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based tick number since the scheduler was created
    pub tick: u64,
    pub nodes_executed: usize,
    /// Nodes whose outputs changed this tick
    pub changed_nodes: usize,
    pub faults: Vec<NodeFault>,
    /// Wall-clock time of the compute phase
    pub duration: Duration,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

struct SchedulerShared {
    pool: Option<rayon::ThreadPool>,
    running: AtomicBool,
    /// Bumped on every start and stop; a loop thread exits once it is outdated
    generation: AtomicU64,
    /// Serializes start, stop and a loop releasing itself
    lifecycle: Mutex<()>,
    ticks_per_second: AtomicU32,
    ticks_executed: AtomicU64,
    last_tick_duration: Mutex<Option<Duration>>,
}

impl SchedulerShared {
    fn execute_once(&self, nodes: &[Arc<Node>]) -> TickReport {
        let start = Instant::now();
        let tick = self.ticks_executed.fetch_add(1, Ordering::SeqCst) + 1;

        // Every node reads only its own inputs and writes only its own
        // outputs, so the fan-out needs no ordering.
        let outcomes: Vec<Result<bool, NodeFault>> = match &self.pool {
            Some(pool) => pool.install(|| nodes.par_iter().map(|node| run_node(node)).collect()),
            None => nodes.iter().map(|node| run_node(node)).collect(),
        };

        let mut changed_nodes = 0;
        let mut faults = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(true) => changed_nodes += 1,
                Ok(false) => {}
                Err(fault) => {
                    warn!("Tick {}: {}", tick, fault);
                    faults.push(fault);
                }
            }
        }

        let duration = start.elapsed();
        *self.last_tick_duration.lock() = Some(duration);
        debug!("Tick {} executed {} nodes in {:?}", tick, nodes.len(), duration);

        TickReport {
            tick,
            nodes_executed: nodes.len(),
            changed_nodes,
            faults,
            duration,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Mark the loop of `generation` as stopped, unless it was already
    /// replaced by a newer start
    fn release(&self, generation: u64) {
        let _lifecycle = self.lifecycle.lock();
        if self.generation.load(Ordering::SeqCst) == generation {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.running.store(false, Ordering::SeqCst);
        }
    }

    fn tick_period(&self) -> Duration {
        let rate = self.ticks_per_second.load(Ordering::Relaxed).max(1);
        Duration::from_secs_f64(1.0 / f64::from(rate))
    }
}

/// Run one node, turning errors and panics into a fault
fn run_node(node: &Node) -> Result<bool, NodeFault> {
    let fault = |message: String| NodeFault {
        node_id: node.id(),
        kind: node.kind().to_string(),
        message,
    };

    match catch_unwind(AssertUnwindSafe(|| node.execute())) {
        Ok(Ok(changed)) => Ok(changed),
        Ok(Err(message)) => Err(fault(message)),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "node panicked".to_string());
            Err(fault(format!("panicked: {}", message)))
        }
    }
}

/// Drives discrete simulation ticks over a node set.
///
/// `execute_once` is the compute phase only: every node computes new outputs
/// from its current inputs. Moving values across connectors is the caller's
/// propagation phase and must run after `execute_once` returns, which gives
/// synchronous (Jacobi-style) semantics independent of node order, cycles
/// included.
pub struct ExecutionScheduler {
    shared: Arc<SchedulerShared>,
    config: SchedulerConfig,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionScheduler {
    /// Create a scheduler, building its worker pool when in Rayon mode
    pub fn new(config: SchedulerConfig) -> Result<Self, String> {
        let pool = match config.concurrency_mode {
            ConcurrencyMode::Sequential => None,
            ConcurrencyMode::Rayon => {
                let size = config.effective_pool_size();
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(size)
                    .thread_name(|i| format!("boardsim-worker-{}", i))
                    .build()
                    .map_err(|e| format!("Failed to build a {}-thread execution pool: {}", size, e))?;
                Some(pool)
            }
        };

        Ok(Self {
            shared: Arc::new(SchedulerShared {
                pool,
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                lifecycle: Mutex::new(()),
                ticks_per_second: AtomicU32::new(clamp_rate(config.ticks_per_second)),
                ticks_executed: AtomicU64::new(0),
                last_tick_duration: Mutex::new(None),
            }),
            config,
            loop_handle: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Execute every node once
    pub fn execute_once(&self, nodes: &[Arc<Node>]) -> TickReport {
        self.shared.execute_once(nodes)
    }

    /// Start ticking `nodes` on a background thread.
    ///
    /// After each compute phase `on_tick` is called with the report; that is
    /// where the host propagates values. Returns `false` without doing
    /// anything if the loop is already running.
    pub fn start_loop<F>(&self, nodes: SharedNodes, mut on_tick: F) -> bool
    where
        F: FnMut(&TickReport) + Send + 'static,
    {
        let lifecycle = self.shared.lifecycle.lock();
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("start_loop ignored: scheduler already running");
            return false;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        drop(lifecycle);
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("boardsim-scheduler".to_string())
            .spawn(move || {
                while shared.is_current(generation) {
                    let tick_start = Instant::now();
                    let snapshot: Vec<Arc<Node>> = nodes.read().clone();
                    let report = shared.execute_once(&snapshot);
                    if catch_unwind(AssertUnwindSafe(|| on_tick(&report))).is_err() {
                        error!("Tick {} callback panicked; stopping scheduler loop", report.tick);
                        shared.release(generation);
                        break;
                    }

                    let period = shared.tick_period();
                    while shared.is_current(generation) {
                        let elapsed = tick_start.elapsed();
                        if elapsed >= period {
                            break;
                        }
                        thread::park_timeout(period - elapsed);
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                *self.loop_handle.lock() = Some(handle);
                info!(
                    "Scheduler loop started at {} ticks/s",
                    self.shared.ticks_per_second.load(Ordering::Relaxed)
                );
                true
            }
            Err(e) => {
                error!("Failed to spawn scheduler loop: {}", e);
                self.shared.release(generation);
                false
            }
        }
    }

    /// Stop the loop.
    ///
    /// Blocks until the in-flight tick (and its callback) has finished. Safe
    /// to call when idle. Called from inside `on_tick` it only requests the
    /// stop, since the loop thread cannot join itself.
    pub fn stop_loop(&self) {
        let was_running = {
            let _lifecycle = self.shared.lifecycle.lock();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            self.shared.running.swap(false, Ordering::SeqCst)
        };
        let Some(handle) = self.loop_handle.lock().take() else {
            return;
        };

        handle.thread().unpark();
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("Scheduler loop thread panicked");
        }
        if was_running {
            info!("Scheduler loop stopped after {} ticks", self.ticks_executed());
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.is_running() {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Change the loop rate, returns the clamped rate actually applied
    pub fn set_ticks_per_second(&self, rate: u32) -> u32 {
        let rate = clamp_rate(rate);
        self.shared.ticks_per_second.store(rate, Ordering::Relaxed);
        rate
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.shared.ticks_per_second.load(Ordering::Relaxed)
    }

    /// Wall-clock duration of the most recent compute phase
    pub fn last_tick_duration(&self) -> Option<Duration> {
        *self.shared.last_tick_duration.lock()
    }

    /// Number of compute phases run so far, single steps included
    pub fn ticks_executed(&self) -> u64 {
        self.shared.ticks_executed.load(Ordering::SeqCst)
    }
}

impl Drop for ExecutionScheduler {
    fn drop(&mut self) {
        self.stop_loop();
    }
}
