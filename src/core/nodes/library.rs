//! Built-in logic gate kinds.
//!
//! Gates with a variable number of inputs read every input pin on each
//! execution, so they keep working after their input list has been grown.

use super::factory::NodeCatalog;
use super::node::{Node, NodeIo, NodeLogic};
use crate::core::values::TypeTag;

pub const AND: &str = "and";
pub const OR: &str = "or";
pub const XOR: &str = "xor";
pub const NOT: &str = "not";
pub const CONSTANT: &str = "constant";
pub const COUNTER: &str = "counter";

fn bool_gate(kind: &str, inputs: usize, reduce: fn(&[bool]) -> bool) -> Node {
    let tags = vec![TypeTag::of::<bool>(); inputs];
    Node::new(kind, &tags, &[TypeTag::of::<bool>()], move |io: &mut NodeIo<'_>| {
        let values: Vec<bool> = io.inputs()?;
        io.set_output(0, reduce(&values))
    })
}

pub fn and_gate() -> Node {
    bool_gate(AND, 2, |values| values.iter().all(|v| *v))
}

pub fn or_gate() -> Node {
    bool_gate(OR, 2, |values| values.iter().any(|v| *v))
}

pub fn xor_gate() -> Node {
    bool_gate(XOR, 2, |values| values.iter().filter(|v| **v).count() % 2 == 1)
}

pub fn not_gate() -> Node {
    bool_gate(NOT, 1, |values| !values.first().copied().unwrap_or(false))
}

/// Source driving a fixed level, `false` by default
pub fn constant(level: bool) -> Node {
    Node::new(CONSTANT, &[], &[TypeTag::of::<bool>()], move |io: &mut NodeIo<'_>| {
        io.set_output(0, level)
    })
}

/// Counts rising edges on its clock input
#[derive(Debug, Default)]
pub struct Counter {
    last_clock: bool,
    count: u32,
}

impl NodeLogic for Counter {
    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<(), String> {
        let clock: bool = io.input(0)?;
        if clock && !self.last_clock {
            self.count = self.count.wrapping_add(1);
        }
        self.last_clock = clock;
        io.set_output(0, self.count)
    }
}

pub fn counter() -> Node {
    Node::new(COUNTER, &[TypeTag::of::<bool>()], &[TypeTag::of::<u32>()], Counter::default())
}

/// Register every built-in kind into `catalog`, skipping kinds already present
pub fn register_builtin_nodes(catalog: &mut NodeCatalog) {
    let builtins: [(&str, fn() -> Node); 6] = [
        (AND, and_gate),
        (OR, or_gate),
        (XOR, xor_gate),
        (NOT, not_gate),
        (CONSTANT, || constant(false)),
        (COUNTER, counter),
    ];

    for (kind, constructor) in builtins {
        if let Err(e) = catalog.register(kind, constructor) {
            log::debug!("Skipping built-in node kind: {}", e);
        }
    }
}
