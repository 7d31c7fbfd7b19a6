//! Coordinate assignment and direction mapping.

use super::LayoutDirection;
use super::rank::Hierarchy;

const REFINEMENT_PASSES: usize = 4;

/// Extents of a vertex in flow-relative terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Extent {
    /// Size across the flow (within a rank).
    pub breadth: f64,
    /// Size along the flow (between ranks).
    pub depth: f64,
}

impl Extent {
    pub const POINT: Self = Self {
        breadth: 0.0,
        depth: 0.0,
    };

    /// Converts a width/height box into flow-relative extents.
    pub fn of_box(width: f64, height: f64, direction: LayoutDirection) -> Self {
        if direction.is_vertical() {
            Self {
                breadth: width,
                depth: height,
            }
        } else {
            Self {
                breadth: height,
                depth: width,
            }
        }
    }
}

/// Spacing used while assigning coordinates.
#[derive(Debug, Clone, Copy)]
pub(super) struct Gaps {
    pub within_rank: f64,
    pub between_ranks: f64,
}

/// Flow-relative coordinates of every vertex.
#[derive(Debug, Clone)]
pub(super) struct Coordinates {
    /// Centre of each vertex across the flow.
    pub across: Vec<f64>,
    /// Start of each rank along the flow.
    pub rank_start: Vec<f64>,
    /// Deepest vertex in each rank.
    pub rank_depth: Vec<f64>,
}

impl Coordinates {
    /// Total length of the layout along the flow.
    pub fn length(&self) -> f64 {
        match (self.rank_start.last(), self.rank_depth.last()) {
            (Some(start), Some(depth)) => start + depth,
            _ => 0.0,
        }
    }

    /// Top-left corner of a real vertex of size `width` x `height`.
    pub fn corner(
        &self,
        hierarchy: &Hierarchy,
        vertex: usize,
        width: f64,
        height: f64,
        direction: LayoutDirection,
    ) -> (f64, f64) {
        let extent = Extent::of_box(width, height, direction);
        let rank = hierarchy.rank[vertex];
        let along = self.rank_start[rank] + (self.rank_depth[rank] - extent.depth) / 2.0;
        let across = self.across[vertex] - extent.breadth / 2.0;
        let reversed = self.length() - along - extent.depth;

        match direction {
            LayoutDirection::Down => (across, along),
            LayoutDirection::Up => (across, reversed),
            LayoutDirection::Right => (along, across),
            LayoutDirection::Left => (reversed, across),
        }
    }
}

/// Centres each rank, then pulls vertices towards the median of their
/// neighbours while keeping the rank order and minimum gaps.
pub(super) fn assign(
    layers: &[Vec<usize>],
    hierarchy: &Hierarchy,
    extents: &[Extent],
    gaps: Gaps,
) -> Coordinates {
    let mut across = vec![0.0f64; hierarchy.vertex_count()];

    for layer in layers {
        let total: f64 = layer.iter().map(|&v| extents[v].breadth).sum::<f64>()
            + layer.len().saturating_sub(1) as f64 * gaps.within_rank;
        let mut cursor = -total / 2.0;
        for &vertex in layer {
            let breadth = extents[vertex].breadth;
            across[vertex] = cursor + breadth / 2.0;
            cursor += breadth + gaps.within_rank;
        }
    }

    for _ in 0..REFINEMENT_PASSES {
        for layer in layers {
            for &vertex in layer {
                let mut neighbours: Vec<f64> = hierarchy.down[vertex]
                    .iter()
                    .chain(&hierarchy.up[vertex])
                    .map(|&n| across[n])
                    .collect();
                if neighbours.is_empty() {
                    continue;
                }
                neighbours.sort_by(f64::total_cmp);
                let median = neighbours[neighbours.len() / 2];
                across[vertex] = (across[vertex] + median) / 2.0;
            }
            separate(layer, extents, gaps.within_rank, &mut across);
        }
    }

    let mut rank_depth = vec![0.0f64; layers.len()];
    for (rank, layer) in layers.iter().enumerate() {
        rank_depth[rank] = layer
            .iter()
            .map(|&v| extents[v].depth)
            .fold(0.0, f64::max);
    }
    let mut rank_start = Vec::with_capacity(layers.len());
    let mut cursor = 0.0;
    for depth in &rank_depth {
        rank_start.push(cursor);
        cursor += depth + gaps.between_ranks;
    }

    Coordinates {
        across,
        rank_start,
        rank_depth,
    }
}

/// Pushes vertices apart, left to right in rank order, until neighbours are
/// at least `gap` apart edge to edge.
fn separate(layer: &[usize], extents: &[Extent], gap: f64, across: &mut [f64]) {
    for pair in layer.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let min_distance = (extents[left].breadth + extents[right].breadth) / 2.0 + gap;
        if across[right] - across[left] < min_distance {
            across[right] = across[left] + min_distance;
        }
    }
}
