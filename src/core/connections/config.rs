//! Configuration for the connection registry

use serde::{Deserialize, Serialize};

/// Whether an output may drive an input on the same node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelfLoopPolicy {
    /// Same-node connectors are legal; the layout resolver fans them out
    #[default]
    Allow,
    /// Connect requests between pins of one node are refused
    Forbid,
}

/// Configuration for connection validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub self_loop_policy: SelfLoopPolicy,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the self-loop policy
    pub fn with_self_loop_policy(mut self, policy: SelfLoopPolicy) -> Self {
        self.self_loop_policy = policy;
        self
    }
}
