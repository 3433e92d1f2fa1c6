use crate::core::connections::ConnectionRegistry;
use crate::core::execution::{ConcurrencyMode, ExecutionScheduler, SchedulerConfig, SchedulerState, SharedNodes};
use crate::core::nodes::library::{constant, counter, not_gate, xor_gate};
use crate::core::nodes::{Node, NodeIo};
use crate::core::values::{TypeTag, TypedValue};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn rayon_scheduler() -> ExecutionScheduler {
    ExecutionScheduler::new(SchedulerConfig::new().with_thread_pool_size(4).with_ticks_per_second(100)).unwrap()
}

fn connect(registry: &ConnectionRegistry, from: &Node, output: usize, to: &Node, input: usize) {
    registry
        .try_connect(&to.input(input).unwrap(), &from.output(output).unwrap(), false)
        .expect("test wiring should be valid");
}

/// Three inverters in a ring feeding an xor and a counter
fn oscillator(registry: &ConnectionRegistry) -> Vec<Arc<Node>> {
    let nodes: Vec<Arc<Node>> = vec![
        Arc::new(not_gate()),
        Arc::new(not_gate()),
        Arc::new(not_gate()),
        Arc::new(xor_gate()),
        Arc::new(counter()),
    ];
    connect(registry, &nodes[0], 0, &nodes[1], 0);
    connect(registry, &nodes[1], 0, &nodes[2], 0);
    connect(registry, &nodes[2], 0, &nodes[0], 0);
    connect(registry, &nodes[0], 0, &nodes[3], 0);
    connect(registry, &nodes[2], 0, &nodes[3], 1);
    connect(registry, &nodes[3], 0, &nodes[4], 0);
    nodes
}

fn output_values(nodes: &[Arc<Node>]) -> Vec<TypedValue> {
    nodes
        .iter()
        .flat_map(|node| node.outputs().iter().map(|pin| pin.value()).collect::<Vec<_>>())
        .collect()
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_execute_once_is_order_independent() {
    let scheduler = rayon_scheduler();
    let registry_a = ConnectionRegistry::default();
    let registry_b = ConnectionRegistry::default();
    let graph_a = oscillator(&registry_a);
    let graph_b = oscillator(&registry_b);

    let mut rng = StdRng::seed_from_u64(7);
    let mut shuffled = graph_b.clone();

    for _ in 0..12 {
        scheduler.execute_once(&graph_a);
        registry_a.propagate();

        shuffled.shuffle(&mut rng);
        scheduler.execute_once(&shuffled);
        registry_b.propagate();

        assert_eq!(output_values(&graph_a), output_values(&graph_b));
    }
}

#[test]
fn test_sequential_and_parallel_agree() {
    let sequential =
        ExecutionScheduler::new(SchedulerConfig::new().with_concurrency(ConcurrencyMode::Sequential)).unwrap();
    let parallel = rayon_scheduler();
    let registry_a = ConnectionRegistry::default();
    let registry_b = ConnectionRegistry::default();
    let graph_a = oscillator(&registry_a);
    let graph_b = oscillator(&registry_b);

    for _ in 0..8 {
        sequential.execute_once(&graph_a);
        registry_a.propagate();
        parallel.execute_once(&graph_b);
        registry_b.propagate();
    }
    assert_eq!(output_values(&graph_a), output_values(&graph_b));
}

#[test]
fn test_feedback_sees_previous_tick() {
    let scheduler = rayon_scheduler();
    let registry = ConnectionRegistry::default();
    let source = Arc::new(constant(true));
    let first = Arc::new(not_gate());
    let second = Arc::new(not_gate());
    connect(&registry, &source, 0, &first, 0);
    connect(&registry, &first, 0, &second, 0);

    // Reverse order: a sequential in-place update would settle in one tick
    let nodes = vec![second.clone(), first.clone(), source.clone()];
    let mut observed = Vec::new();
    for _ in 0..3 {
        scheduler.execute_once(&nodes);
        registry.propagate();
        observed.push(second.output(0).unwrap().get::<bool>().unwrap());
    }
    assert_eq!(observed, vec![true, false, true]);
}

#[test]
fn test_faulty_nodes_do_not_abort_tick() {
    let scheduler = rayon_scheduler();
    let healthy = Arc::new(not_gate());
    let failing = Arc::new(Node::new("failing", &[], &[], |_io: &mut NodeIo<'_>| {
        Err::<(), String>("bad input".to_string())
    }));
    let panicking = Arc::new(Node::new("panicking", &[], &[TypeTag::of::<bool>()], |_io: &mut NodeIo<'_>| {
        if true {
            panic!("plugin bug");
        }
        Ok::<(), String>(())
    }));

    let nodes = vec![failing.clone(), healthy.clone(), panicking.clone()];
    let report = scheduler.execute_once(&nodes);

    assert_eq!(report.nodes_executed, 3);
    assert_eq!(report.faults.len(), 2);
    assert!(!report.is_clean());
    assert!(healthy.output(0).unwrap().get::<bool>().unwrap());

    let failing_fault = report.faults.iter().find(|f| f.node_id == failing.id()).unwrap();
    assert_eq!(failing_fault.message, "bad input");
    let panic_fault = report.faults.iter().find(|f| f.node_id == panicking.id()).unwrap();
    assert!(panic_fault.message.contains("plugin bug"));
    assert_eq!(panic_fault.kind, "panicking");

    // The next tick still runs every node
    assert_eq!(scheduler.execute_once(&nodes).nodes_executed, 3);
    assert_eq!(scheduler.ticks_executed(), 2);
}

#[test]
fn test_loop_start_stop() {
    let scheduler = rayon_scheduler();
    let registry = Arc::new(ConnectionRegistry::default());
    let nodes: SharedNodes = Arc::new(RwLock::new(oscillator(&registry)));
    let ticks = Arc::new(AtomicU64::new(0));

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(scheduler.last_tick_duration().is_none());

    let counter = ticks.clone();
    let propagation = registry.clone();
    assert!(scheduler.start_loop(nodes.clone(), move |_report| {
        propagation.propagate();
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(scheduler.state(), SchedulerState::Running);

    // Re-entrant start is ignored
    assert!(!scheduler.start_loop(nodes.clone(), |_report| {}));

    assert!(wait_until(Duration::from_secs(5), || ticks.load(Ordering::SeqCst) >= 3));
    scheduler.stop_loop();
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    let after_stop = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop, "no tick may start after stop");
    assert!(scheduler.last_tick_duration().is_some());

    // Idempotent
    scheduler.stop_loop();
    assert!(!scheduler.is_running());
}

#[test]
fn test_loop_survives_faulty_node() {
    let scheduler = rayon_scheduler();
    let broken = Node::new("broken", &[], &[], |_io: &mut NodeIo<'_>| Err::<(), String>("nope".to_string()));
    let nodes: SharedNodes = Arc::new(RwLock::new(vec![Arc::new(broken), Arc::new(not_gate())]));
    let faulty_ticks = Arc::new(AtomicU64::new(0));

    let seen = faulty_ticks.clone();
    scheduler.start_loop(nodes, move |report| {
        if report.faults.len() == 1 {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(wait_until(Duration::from_secs(5), || faulty_ticks.load(Ordering::SeqCst) >= 3));
    assert!(scheduler.is_running());
    scheduler.stop_loop();
}

#[test]
fn test_stop_from_tick_callback() {
    let scheduler = Arc::new(rayon_scheduler());
    let nodes: SharedNodes = Arc::new(RwLock::new(vec![Arc::new(not_gate())]));
    let ticks = Arc::new(AtomicU64::new(0));

    let handle = Arc::downgrade(&scheduler);
    let counter = ticks.clone();
    scheduler.start_loop(nodes, move |_report| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(scheduler) = handle.upgrade() {
            scheduler.stop_loop();
        }
    });

    assert!(wait_until(Duration::from_secs(5), || !scheduler.is_running()));
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_callback_stops_loop_cleanly() {
    let scheduler = rayon_scheduler();
    let nodes: SharedNodes = Arc::new(RwLock::new(vec![Arc::new(not_gate())]));

    assert!(scheduler.start_loop(nodes.clone(), |_report| panic!("host callback")));
    assert!(wait_until(Duration::from_secs(5), || !scheduler.is_running()));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    let ticks_after_panic = scheduler.ticks_executed();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(scheduler.ticks_executed(), ticks_after_panic);

    // The scheduler can be started again
    let ticks = Arc::new(AtomicU64::new(0));
    let counter = ticks.clone();
    assert!(scheduler.start_loop(nodes, move |_report| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(wait_until(Duration::from_secs(5), || ticks.load(Ordering::SeqCst) >= 2));
    scheduler.stop_loop();
    assert!(!scheduler.is_running());
}

#[test]
fn test_tick_rate_is_clamped() {
    let scheduler = rayon_scheduler();
    assert_eq!(scheduler.ticks_per_second(), 100);
    assert_eq!(scheduler.set_ticks_per_second(0), 1);
    assert_eq!(scheduler.set_ticks_per_second(250), 100);
    assert_eq!(scheduler.set_ticks_per_second(30), 30);
    assert_eq!(scheduler.ticks_per_second(), 30);
}
