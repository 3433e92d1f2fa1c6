use boardsim::core::nodes::library::{COUNTER, NOT};
use boardsim::{Board, NodeCatalog, RegistryConfig, SchedulerConfig};
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RING_SIZE: usize = 5;

fn main() -> Result<(), String> {
    env_logger::init();
    println!("Starting ring oscillator demo");

    let board = Board::new(
        Arc::new(NodeCatalog::with_builtins()),
        SchedulerConfig::new().with_ticks_per_second(50),
        RegistryConfig::default(),
    )?;

    // =========================
    // 1. BUILD THE RING
    // =========================

    let mut ring = Vec::with_capacity(RING_SIZE);
    for _ in 0..RING_SIZE {
        ring.push(board.spawn_node(NOT)?);
    }
    for i in 0..RING_SIZE {
        let from = ring[i].output(0).ok_or("inverter without output")?;
        let to = ring[(i + 1) % RING_SIZE].input(0).ok_or("inverter without input")?;
        board
            .connect(&to, &from)
            .ok_or_else(|| format!("Failed to connect inverter {} to {}", i, (i + 1) % RING_SIZE))?;
    }

    let counter = board.spawn_node(COUNTER)?;
    let tap = ring[0].output(0).ok_or("inverter without output")?;
    board
        .connect(&counter.input(0).ok_or("counter without input")?, &tap)
        .ok_or("Failed to attach counter")?;

    println!("Ring of {} inverters wired with {} connectors", RING_SIZE, board.registry().len());

    // =========================
    // 2. RUN IN THE BACKGROUND
    // =========================

    let ticks = Arc::new(AtomicU64::new(0));
    let seen = ticks.clone();
    board.start(move |report| {
        let tick = seen.fetch_add(1, Ordering::SeqCst) + 1;
        if !report.is_clean() {
            for fault in &report.faults {
                log::warn!("{}", fault);
            }
        }
        if tick % 10 == 0 {
            info!("tick {}: {} nodes changed in {:?}", report.tick, report.changed_nodes, report.duration);
        }
    });

    std::thread::sleep(Duration::from_secs(1));
    board.stop();

    let edges = counter
        .output(0)
        .ok_or("counter without output")?
        .get::<u32>()?;
    println!("Ran {} ticks, counter saw {} rising edges", ticks.load(Ordering::SeqCst), edges);

    // =========================
    // 3. COPY AND PASTE
    // =========================

    let ids: Vec<_> = ring.iter().map(|node| node.id()).collect();
    board.copy(&ids);
    let pasted = board.paste().ok_or("Nothing to paste")?;
    println!(
        "Pasted a second ring: {} nodes, {} connectors (board now has {} nodes)",
        pasted.nodes.len(),
        pasted.connectors.len(),
        board.nodes().len()
    );

    for _ in 0..RING_SIZE * 2 {
        board.step()?;
    }
    let levels: Vec<bool> = pasted
        .built_nodes()
        .iter()
        .filter_map(|node| node.output(0).and_then(|pin| pin.get::<bool>().ok()))
        .collect();
    println!("Pasted ring levels after {} steps: {:?}", RING_SIZE * 2, levels);

    Ok(())
}
