//! Layered engine: ranks, orders and places the nodes, then moves the
//! drawing so its top-left corner sits at the padding.

use super::order::order_layers;
use super::position::{Extent, Gaps, assign};
use super::rank;
use super::{LayoutEngine, LayoutOptions, LayoutProblem, NodePlacement};
use crate::error::LayoutError;
use crate::node::NodeId;
use std::collections::HashMap;

/// Sugiyama-style layered layout.
///
/// Cycles are broken by reversing a greedy feedback arc set, nodes are ranked
/// by longest path, ranks are ordered by barycenter sweeps and coordinates are
/// assigned by median refinement. No randomness is involved, so the output is
/// a pure function of the problem and options.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredLayout;

impl LayoutEngine for LayeredLayout {
    fn compute(
        &self,
        problem: &LayoutProblem,
        options: &LayoutOptions,
    ) -> Result<Vec<NodePlacement>, LayoutError> {
        options.validate()?;
        if problem.nodes.len() > options.max_nodes {
            return Err(LayoutError::TooLarge {
                nodes: problem.nodes.len(),
                limit: options.max_nodes,
            });
        }
        if problem.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut slot: HashMap<&NodeId, usize> = HashMap::with_capacity(problem.nodes.len());
        for (index, node) in problem.nodes.iter().enumerate() {
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(node.width) || !valid(node.height) {
                return Err(LayoutError::InvalidDimension {
                    node_id: node.id.clone(),
                });
            }
            slot.entry(&node.id).or_insert(index);
        }

        let resolve = |id: &NodeId| {
            slot.get(id)
                .copied()
                .ok_or_else(|| LayoutError::UnknownEndpoint {
                    node_id: id.clone(),
                })
        };
        let edges = problem
            .edges
            .iter()
            .map(|edge| Ok((resolve(&edge.source)?, resolve(&edge.target)?)))
            .collect::<Result<Vec<_>, LayoutError>>()?;

        let hierarchy = rank::build(problem.nodes.len(), &edges)?;
        let layers = order_layers(&hierarchy, options.max_sweeps);

        let direction = options.direction;
        let extents: Vec<Extent> = (0..hierarchy.vertex_count())
            .map(|vertex| match problem.nodes.get(vertex) {
                Some(node) if !hierarchy.is_virtual(vertex) => {
                    Extent::of_box(node.width, node.height, direction)
                }
                _ => Extent::POINT,
            })
            .collect();
        let gaps = Gaps {
            within_rank: options.spacing,
            between_ranks: options.layer_spacing,
        };
        let coords = assign(&layers, &hierarchy, &extents, gaps);

        let corners: Vec<(f64, f64)> = problem
            .nodes
            .iter()
            .enumerate()
            .map(|(vertex, node)| coords.corner(&hierarchy, vertex, node.width, node.height, direction))
            .collect();

        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);

        Ok(problem
            .nodes
            .iter()
            .zip(corners)
            .map(|(node, (x, y))| NodePlacement {
                id: node.id.clone(),
                x: x - min_x + options.padding,
                y: y - min_y + options.padding,
            })
            .collect())
    }
}
