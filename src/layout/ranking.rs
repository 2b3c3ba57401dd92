//! Rank assignment and in-rank ordering for the layered engine.
//!
//! Elements are addressed by their slot in the layered list handed to the
//! hierarchical pass; edges are the projected route edges mapped to slots.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Directed graph over layered slots.
#[derive(Debug, Clone)]
pub(super) struct LayerGraph {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl LayerGraph {
    /// Builds the graph from slot pairs; out-of-range pairs, self loops and
    /// repeated pairs are dropped.
    pub(super) fn new(slots: usize, edges: &[(usize, usize)]) -> Self {
        let mut graph = Self {
            successors: vec![Vec::new(); slots],
            predecessors: vec![Vec::new(); slots],
        };
        for &(from, to) in edges {
            if from >= slots || to >= slots || from == to || graph.successors[from].contains(&to) {
                continue;
            }
            graph.successors[from].push(to);
            graph.predecessors[to].push(from);
        }
        graph
    }

    pub(super) fn len(&self) -> usize {
        self.successors.len()
    }

    pub(super) fn successors(&self, slot: usize) -> &[usize] {
        &self.successors[slot]
    }

    pub(super) fn predecessors(&self, slot: usize) -> &[usize] {
        &self.predecessors[slot]
    }

    /// Copy without back edges. Depth-first search starts from slots in
    /// declaration order, so the earliest declared element of a cycle stays
    /// on top.
    pub(super) fn without_back_edges(&self) -> LayerGraph {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Fresh,
            Open,
            Done,
        }

        let mut marks = vec![Mark::Fresh; self.len()];
        let mut kept: Vec<(usize, usize)> = Vec::new();
        for root in 0..self.len() {
            if marks[root] != Mark::Fresh {
                continue;
            }
            marks[root] = Mark::Open;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(frame) = stack.last_mut() {
                let (slot, cursor) = *frame;
                let Some(&next) = self.successors[slot].get(cursor) else {
                    marks[slot] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;
                match marks[next] {
                    Mark::Open => {}
                    Mark::Done => kept.push((slot, next)),
                    Mark::Fresh => {
                        kept.push((slot, next));
                        marks[next] = Mark::Open;
                        stack.push((next, 0));
                    }
                }
            }
        }
        // keep successor lists in input order
        kept.sort_by_key(|&(from, to)| {
            let position = self.successors[from]
                .iter()
                .position(|&candidate| candidate == to)
                .unwrap_or(usize::MAX);
            (from, position)
        });
        LayerGraph::new(self.len(), &kept)
    }

    /// Longest-path ranks; sources sit on rank 0. Expects an acyclic graph
    /// (see [`LayerGraph::without_back_edges`]); slots left over by a cycle
    /// keep rank 0.
    pub(super) fn longest_path_ranks(&self) -> Vec<usize> {
        let mut ranks = vec![0usize; self.len()];
        let mut pending: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(slot, _)| Reverse(slot))
            .collect();
        while let Some(Reverse(slot)) = ready.pop() {
            for &next in &self.successors[slot] {
                ranks[next] = ranks[next].max(ranks[slot] + 1);
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
        ranks
    }
}

/// Groups slots by rank, each layer in declaration order.
pub(super) fn layers_from_ranks(ranks: &[usize]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().copied().max().map_or(0, |max| max + 1);
    let mut layers = vec![Vec::new(); depth];
    for (slot, rank) in ranks.iter().enumerate() {
        layers[*rank].push(slot);
    }
    layers
}

/// Median of the neighbours' positions, `None` when no neighbour is placed.
pub(super) fn median_position(neighbors: &[usize], position: &[Option<usize>]) -> Option<f32> {
    let mut values: Vec<usize> = neighbors.iter().filter_map(|slot| position[*slot]).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 1 {
        values[mid] as f32
    } else {
        (values[mid - 1] + values[mid]) as f32 / 2.0
    })
}

/// Crossings between consecutive layers, counting only edges that span one
/// rank.
pub(super) fn count_crossings(layers: &[Vec<usize>], graph: &LayerGraph) -> usize {
    let position = positions_of(layers, graph.len());
    let mut crossings = 0;
    for pair in layers.windows(2) {
        let mut segments: Vec<(usize, usize)> = Vec::new();
        for &slot in &pair[0] {
            for &next in graph.successors(slot) {
                if pair[1].contains(&next) {
                    if let (Some(from), Some(to)) = (position[slot], position[next]) {
                        segments.push((from, to));
                    }
                }
            }
        }
        for (i, a) in segments.iter().enumerate() {
            for b in &segments[i + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}

fn positions_of(layers: &[Vec<usize>], slots: usize) -> Vec<Option<usize>> {
    let mut position = vec![None; slots];
    for layer in layers {
        for (index, slot) in layer.iter().enumerate() {
            position[*slot] = Some(index);
        }
    }
    position
}

/// Reorders every layer by the median heuristic: a downward sweep against
/// predecessors, then an upward sweep against successors, `passes` times.
/// The ordering with the fewest crossings seen is kept; ties keep the
/// earlier one.
pub(super) fn order_layers(layers: &mut [Vec<usize>], graph: &LayerGraph, passes: usize) {
    if layers.len() <= 1 {
        return;
    }
    let mut best = layers.to_vec();
    let mut best_crossings = count_crossings(layers, graph);

    for _ in 0..passes.max(1) {
        if best_crossings == 0 {
            break;
        }
        for rank in 1..layers.len() {
            let position = positions_of(layers, graph.len());
            sort_layer(&mut layers[rank], &position, |slot| graph.predecessors(slot));
        }
        for rank in (0..layers.len() - 1).rev() {
            let position = positions_of(layers, graph.len());
            sort_layer(&mut layers[rank], &position, |slot| graph.successors(slot));
        }
        let crossings = count_crossings(layers, graph);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.to_vec();
        }
    }
    layers.clone_from_slice(&best);
}

/// Stable sort by neighbour median; slots without placed neighbours keep
/// their current index as key.
fn sort_layer<'g>(
    layer: &mut Vec<usize>,
    position: &[Option<usize>],
    neighbors: impl Fn(usize) -> &'g [usize],
) {
    if layer.len() <= 1 {
        return;
    }
    let mut keyed: Vec<(f32, usize, usize)> = layer
        .iter()
        .enumerate()
        .map(|(index, &slot)| {
            let key = median_position(neighbors(slot), position).unwrap_or(index as f32);
            (key, index, slot)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    *layer = keyed.into_iter().map(|(_, _, slot)| slot).collect();
}
