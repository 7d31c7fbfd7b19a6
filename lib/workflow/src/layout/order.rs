//! Per-rank ordering by alternating barycenter sweeps.

use super::rank::Hierarchy;

/// Orders each rank to reduce edge crossings.
///
/// Sweeps alternate between top-down (ordering a rank by its predecessors) and
/// bottom-up (by its successors). The ordering with the fewest crossings seen
/// so far is kept; ties keep the earlier one.
pub(super) fn order_layers(hierarchy: &Hierarchy, max_sweeps: usize) -> Vec<Vec<usize>> {
    let mut layers = hierarchy.layers();
    let mut best = layers.clone();
    let mut best_crossings = count_crossings(&layers, hierarchy);

    for sweep in 0..max_sweeps {
        if best_crossings == 0 {
            break;
        }

        if sweep % 2 == 0 {
            for rank in 1..layers.len() {
                reorder(&mut layers, rank, rank - 1, &hierarchy.up);
            }
        } else {
            for rank in (0..layers.len().saturating_sub(1)).rev() {
                reorder(&mut layers, rank, rank + 1, &hierarchy.down);
            }
        }

        let crossings = count_crossings(&layers, hierarchy);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
    }

    best
}

/// Sorts `layers[rank]` by the mean position of each vertex's neighbours in
/// `layers[reference]`. Vertices without such neighbours keep their slot.
fn reorder(layers: &mut [Vec<usize>], rank: usize, reference: usize, neighbours: &[Vec<usize>]) {
    let slot = slots(&layers[reference], neighbours.len());

    let mut keyed: Vec<(f64, usize, usize)> = layers[rank]
        .iter()
        .enumerate()
        .map(|(current, &vertex)| {
            let positions: Vec<usize> = neighbours[vertex]
                .iter()
                .filter_map(|&n| slot[n])
                .collect();
            let barycenter = if positions.is_empty() {
                current as f64
            } else {
                positions.iter().sum::<usize>() as f64 / positions.len() as f64
            };
            (barycenter, current, vertex)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    layers[rank] = keyed.into_iter().map(|(_, _, vertex)| vertex).collect();
}

/// Maps each vertex to its index within `layer`.
fn slots(layer: &[usize], vertex_count: usize) -> Vec<Option<usize>> {
    let mut slot = vec![None; vertex_count];
    for (index, &vertex) in layer.iter().enumerate() {
        slot[vertex] = Some(index);
    }
    slot
}

/// Counts pairwise crossings between every pair of consecutive ranks.
pub(super) fn count_crossings(layers: &[Vec<usize>], hierarchy: &Hierarchy) -> usize {
    layers
        .windows(2)
        .map(|pair| crossings_between(&pair[0], &pair[1], hierarchy))
        .sum()
}

fn crossings_between(upper: &[usize], lower: &[usize], hierarchy: &Hierarchy) -> usize {
    let lower_slot = slots(lower, hierarchy.vertex_count());

    let mut segments: Vec<(usize, usize)> = upper
        .iter()
        .enumerate()
        .flat_map(|(from, &vertex)| {
            let lower_slot = &lower_slot;
            hierarchy.down[vertex]
                .iter()
                .filter_map(move |&target| lower_slot[target].map(|to| (from, to)))
        })
        .collect();
    segments.sort_unstable();

    // Fenwick tree over lower slots: a segment crosses every earlier segment
    // that lands strictly further right.
    let mut tree = vec![0usize; lower.len() + 1];
    let mut seen = 0usize;
    let mut crossings = 0usize;
    for (_, to) in segments {
        let mut at_or_left = 0;
        let mut i = to + 1;
        while i > 0 {
            at_or_left += tree[i];
            i &= i - 1;
        }
        crossings += seen - at_or_left;

        let mut i = to + 1;
        while i < tree.len() {
            tree[i] += 1;
            i += i & i.wrapping_neg();
        }
        seen += 1;
    }
    crossings
}
