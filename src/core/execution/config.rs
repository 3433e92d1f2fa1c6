//! Configuration for tick execution
//!
//! This module provides configuration types for controlling how the scheduler
//! fans node execution out over threads and how fast the loop ticks.

use serde::{Deserialize, Serialize};

/// Lowest accepted loop rate
pub const MIN_TICKS_PER_SECOND: u32 = 1;
/// Highest accepted loop rate
pub const MAX_TICKS_PER_SECOND: u32 = 100;
/// Loop rate used when none is configured
pub const DEFAULT_TICKS_PER_SECOND: u32 = 10;

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Nodes are executed one after another on the calling thread
    Sequential,
    /// Nodes are executed concurrently on a bounded Rayon pool
    #[default]
    Rayon,
}

/// Configuration for the execution scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// The concurrency mode to use for execution
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool for parallel execution.
    /// `None` sizes the pool to the available hardware concurrency.
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
    /// Target loop rate, clamped to `MIN_TICKS_PER_SECOND..=MAX_TICKS_PER_SECOND`
    pub ticks_per_second: u32,
}

impl SchedulerConfig {
    /// Create a new scheduler configuration with default values
    ///
    /// Default configuration uses a hardware-sized Rayon pool at 10 ticks/s
    pub fn new() -> Self {
        Self {
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
        }
    }

    /// Set the concurrency mode
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size.max(1));
        self
    }

    /// Set the loop rate; out-of-range values are clamped
    pub fn with_ticks_per_second(mut self, rate: u32) -> Self {
        self.ticks_per_second = clamp_rate(rate);
        self
    }

    /// Number of worker threads the pool should use
    pub fn effective_pool_size(&self) -> usize {
        self.thread_pool_size.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a loop rate into the accepted range
pub fn clamp_rate(rate: u32) -> u32 {
    rate.clamp(MIN_TICKS_PER_SECOND, MAX_TICKS_PER_SECOND)
}
