use super::compatibility::TypeCompatibility;
use super::config::SelfLoopPolicy;
use crate::core::pins::Pin;
use crate::core::types::{ConnectorId, PinId, PinKind};
use std::collections::HashMap;

/// Centralized connection validation logic.
///
/// Each check returns a message describing why a connection is refused, so
/// callers that need to show the reason can build one.
pub struct ConnectionValidator;

impl ConnectionValidator {
    /// Validate pin directions: `input` must be an input, `output` an output
    pub fn validate_directions(input: &Pin, output: &Pin) -> Result<(), String> {
        if input.kind() != PinKind::Input {
            return Err(format!("Pin {} is not an input pin", input.id()));
        }
        if output.kind() != PinKind::Output {
            return Err(format!("Pin {} is not an output pin", output.id()));
        }
        Ok(())
    }

    /// Validate that both pins carry the same element type
    pub fn validate_types(checker: &dyn TypeCompatibility, input: &Pin, output: &Pin) -> Result<(), String> {
        if !checker.is_same_type(input, output) {
            return Err(format!(
                "Type mismatch: output carries {}, input expects {}",
                output.value_type(),
                input.value_type()
            ));
        }
        Ok(())
    }

    /// Check if an input pin is already connected (prevents multiple drivers)
    pub fn check_input_collision(input_sources: &HashMap<PinId, ConnectorId>, input: &Pin) -> Result<(), String> {
        if let Some(existing) = input_sources.get(&input.id()) {
            return Err(format!(
                "Input pin {} is already driven by {}. Multiple drivers not allowed.",
                input.id(),
                existing
            ));
        }
        Ok(())
    }

    /// Check the pair against the self-loop policy
    pub fn check_self_loop(policy: SelfLoopPolicy, input: &Pin, output: &Pin) -> Result<(), String> {
        if policy == SelfLoopPolicy::Forbid && input.owner() == output.owner() {
            return Err(format!("Pins {} and {} belong to the same node {}", output.id(), input.id(), input.owner()));
        }
        Ok(())
    }

    /// Run every check in order, stopping at the first failure
    pub fn validate_connection(
        checker: &dyn TypeCompatibility,
        policy: SelfLoopPolicy,
        input_sources: &HashMap<PinId, ConnectorId>,
        input: &Pin,
        output: &Pin,
    ) -> Result<(), String> {
        Self::validate_directions(input, output)?;
        Self::validate_types(checker, input, output)?;
        Self::check_input_collision(input_sources, input)?;
        Self::check_self_loop(policy, input, output)?;
        Ok(())
    }
}
