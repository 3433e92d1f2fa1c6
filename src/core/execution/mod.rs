pub mod config;
pub mod scheduler;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SchedulerConfig};
pub use scheduler::{ExecutionScheduler, NodeFault, SchedulerState, SharedNodes, TickReport};
