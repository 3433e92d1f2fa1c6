//! Routing order for connectors that share an endpoint.
//!
//! Pure geometry: nothing here reads or mutates registry state.

use crate::core::connections::Connector;
use crate::core::nodes::Node;
use crate::core::pins::Pin;
use crate::core::types::ConnectorId;
use std::sync::Arc;

/// Stateless helper computing connector stacking offsets and fan-out ranks
pub struct ConnectorLayoutResolver;

impl ConnectorLayoutResolver {
    /// Routing offset of a connector whose ends may sit on the same node.
    ///
    /// `node` is the owner of `input`. Returns `(offset, pin_count)`. When
    /// `output` belongs to another node the connector is not self-connecting
    /// and the result is `(0.0, 1)`.
    ///
    /// Otherwise `pin_count` is the node's input count. The side with more
    /// pins (inputs on a strict majority, outputs on a tie or less) supplies
    /// the index: pins in the lower half get `-(count - index) / 2`, the rest
    /// `index / 2`, spreading routes symmetrically around the pin centerline.
    pub fn self_connection_offset(node: &Node, input: &Pin, output: &Pin) -> (f64, usize) {
        if input.owner() != node.id() || output.owner() != node.id() {
            return (0.0, 1);
        }

        let pin_count = node.input_count();
        let output_count = node.output_count();

        // Only the side choice looks at outputs; pin_count stays the input
        // count either way.
        let (index, side_count) = if pin_count > output_count {
            (input.index(), pin_count)
        } else {
            (output.index(), output_count)
        };

        let offset = if index < side_count / 2 {
            -((side_count + 1 - index - 1) as f64) / 2.0
        } else {
            index as f64 / 2.0
        };

        (offset, pin_count)
    }

    /// Rank every connector driven by `output` by the vertical position of
    /// its input pin, ascending.
    ///
    /// Connectors from other outputs are ignored. Input pins whose position
    /// cannot be resolved (or is not finite) are left out of the ordering.
    pub fn fan_out_ranks<F>(output: &Pin, connectors: &[Arc<Connector>], vertical_position_of: F) -> Vec<(ConnectorId, usize)>
    where
        F: Fn(&Pin) -> Option<f64>,
    {
        let mut positioned: Vec<(f64, ConnectorId)> = connectors
            .iter()
            .filter(|c| c.output().id() == output.id())
            .filter_map(|c| {
                vertical_position_of(c.input())
                    .filter(|y| y.is_finite())
                    .map(|y| (y, c.id()))
            })
            .collect();

        positioned.sort_by(|a, b| a.0.total_cmp(&b.0));
        positioned
            .into_iter()
            .enumerate()
            .map(|(rank, (_, id))| (id, rank))
            .collect()
    }

    /// Ordinal of `connector` among the connectors sharing `output`.
    ///
    /// `None` when the connector is not in the ordering (different output,
    /// or its input position could not be resolved).
    pub fn fan_out_order<F>(
        output: &Pin,
        connectors: &[Arc<Connector>],
        vertical_position_of: F,
        connector: &Connector,
    ) -> Option<usize>
    where
        F: Fn(&Pin) -> Option<f64>,
    {
        Self::fan_out_ranks(output, connectors, vertical_position_of)
            .into_iter()
            .find(|(id, _)| *id == connector.id())
            .map(|(_, rank)| rank)
    }
}
