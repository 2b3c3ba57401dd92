use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use super::frames::Frames;
use super::ranking::{LayerGraph, layers_from_ranks, order_layers};
use crate::config::{LayoutConfig, LayoutEngine};
use crate::ir::{Direction, EdgeKind, FlowGraph};

/// Centre coordinates assigned to top-level elements, keyed by node index.
pub(crate) type Centers = HashMap<usize, (f32, f32)>;

/// Route edges contracted onto top-level elements: every endpoint is replaced
/// by its outermost group. Unknown endpoints, self loops after projection and
/// repeated pairs are dropped.
pub(crate) fn project_route_edges(
    graph: &FlowGraph,
    frames: &Frames,
    layered: &HashSet<usize>,
) -> Vec<(usize, usize)> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut projected = Vec::new();
    for edge in &graph.edges {
        if edge.kind != EdgeKind::Route {
            continue;
        }
        let (Some(source), Some(target)) =
            (frames.index_of(&edge.source), frames.index_of(&edge.target))
        else {
            debug!(source = %edge.source, target = %edge.target, "skipping edge with unknown endpoint");
            continue;
        };
        let from = frames.top_level(source);
        let to = frames.top_level(target);
        if !layered.contains(&from) || !layered.contains(&to) {
            debug!(source = %edge.source, target = %edge.target, "skipping route edge outside the flow layers");
            continue;
        }
        if from == to {
            trace!(source = %edge.source, target = %edge.target, "skipping self loop after projection");
            continue;
        }
        if seen.insert((from, to)) {
            projected.push((from, to));
        }
    }
    projected
}

/// Runs the hierarchical pass over `layered` (top-level steps and groups,
/// in declaration order) using `sizes` as footprints.
pub(crate) fn layout_layers(
    graph: &FlowGraph,
    frames: &Frames,
    layered: &[usize],
    sizes: &[(f32, f32)],
    config: &LayoutConfig,
) -> Centers {
    if layered.is_empty() {
        return Centers::new();
    }
    let layered_set: HashSet<usize> = layered.iter().copied().collect();
    let edges = project_route_edges(graph, frames, &layered_set);

    if config.engine == LayoutEngine::Dagre {
        let centers = assign_centers_dagre(graph, layered, &edges, sizes, config);
        if layered.iter().all(|idx| centers.contains_key(idx)) {
            return centers;
        }
        debug!("dagre left elements unplaced; using layered engine");
    }
    assign_centers_layered(layered, &edges, sizes, config)
}

fn assign_centers_dagre(
    graph: &FlowGraph,
    layered: &[usize],
    edges: &[(usize, usize)],
    sizes: &[(f32, f32)],
    config: &LayoutConfig,
) -> Centers {
    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(config.direction).to_string());
    graph_config.nodesep = Some(config.node_spacing);
    graph_config.ranksep = Some(config.rank_spacing);
    graph_config.marginx = Some(config.margin);
    graph_config.marginy = Some(config.margin);
    dagre_graph.set_graph(graph_config);

    for (order, idx) in layered.iter().enumerate() {
        let (width, height) = sizes[*idx];
        let mut node = DagreNode::default();
        node.width = width;
        node.height = height;
        node.order = Some(order);
        dagre_graph.set_node(graph.nodes[*idx].id.clone(), Some(node));
    }

    for (from, to) in edges {
        let from_id = graph.nodes[*from].id.clone();
        let to_id = graph.nodes[*to].id.clone();
        let edge_label = DagreEdge::default();
        let _ = dagre_graph.set_edge(&from_id, &to_id, Some(edge_label), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let mut centers = Centers::new();
    for idx in layered {
        let node_id = graph.nodes[*idx].id.clone();
        let Some(dagre_node) = dagre_graph.node(&node_id) else {
            continue;
        };
        if !dagre_node.x.is_finite() || !dagre_node.y.is_finite() {
            continue;
        }
        centers.insert(*idx, (dagre_node.x, dagre_node.y));
    }
    centers
}

fn assign_centers_layered(
    layered: &[usize],
    edges: &[(usize, usize)],
    sizes: &[(f32, f32)],
    config: &LayoutConfig,
) -> Centers {
    let horizontal = config.direction == Direction::LeftRight;
    let slot_of: HashMap<usize, usize> = layered
        .iter()
        .enumerate()
        .map(|(slot, idx)| (*idx, slot))
        .collect();
    let slot_edges: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|(from, to)| Some((*slot_of.get(from)?, *slot_of.get(to)?)))
        .collect();

    let graph = LayerGraph::new(layered.len(), &slot_edges).without_back_edges();
    let ranks = graph.longest_path_ranks();
    let mut layers = layers_from_ranks(&ranks);
    order_layers(&mut layers, &graph, config.order_passes);

    // (depth along the rank axis, half extent across it)
    let extent = |slot: usize| -> (f32, f32) {
        let (width, height) = sizes[layered[slot]];
        if horizontal { (width, height / 2.0) } else { (height, width / 2.0) }
    };

    let mut main = vec![0.0_f32; layered.len()];
    let mut cursor = config.margin;
    for layer in &layers {
        let depth = layer.iter().map(|slot| extent(*slot).0).fold(0.0_f32, f32::max);
        for slot in layer {
            main[*slot] = cursor + depth / 2.0;
        }
        cursor += depth + config.rank_spacing;
    }

    // Each layer is packed left to right in its median order, then shifted
    // as a block so its mean sits on the mean of the neighbours' centres.
    let mut cross: Vec<Option<f32>> = vec![None; layered.len()];
    let mut place_layer = |layer: &[usize], downward: bool| {
        if layer.is_empty() {
            return;
        }
        let desired: Vec<f32> = layer
            .iter()
            .map(|slot| {
                let neighbors = if downward {
                    graph.predecessors(*slot)
                } else {
                    graph.successors(*slot)
                };
                let placed: Vec<f32> = neighbors.iter().filter_map(|n| cross[*n]).collect();
                if placed.is_empty() {
                    cross[*slot].unwrap_or(0.0)
                } else {
                    placed.iter().sum::<f32>() / placed.len() as f32
                }
            })
            .collect();
        let mut packed: Vec<f32> = Vec::with_capacity(layer.len());
        for (i, slot) in layer.iter().enumerate() {
            let center = match i.checked_sub(1) {
                Some(prev) => {
                    let floor = packed[prev] + extent(layer[prev]).1 + extent(*slot).1 + config.node_spacing;
                    desired[i].max(floor)
                }
                None => desired[i],
            };
            packed.push(center);
        }
        let count = layer.len() as f32;
        let delta = desired.iter().sum::<f32>() / count - packed.iter().sum::<f32>() / count;
        for (slot, center) in layer.iter().zip(packed) {
            cross[*slot] = Some(center + delta);
        }
    };

    for _ in 0..2 {
        for layer in &layers {
            place_layer(layer.as_slice(), true);
        }
        for layer in layers.iter().rev() {
            place_layer(layer.as_slice(), false);
        }
    }

    let min_cross = (0..layered.len())
        .map(|slot| cross[slot].unwrap_or(0.0) - extent(slot).1)
        .fold(f32::INFINITY, f32::min);
    let shift = if min_cross.is_finite() {
        config.margin - min_cross
    } else {
        0.0
    };

    layered
        .iter()
        .enumerate()
        .map(|(slot, idx)| {
            let across = cross[slot].unwrap_or(0.0) + shift;
            let center = if horizontal {
                (main[slot], across)
            } else {
                (across, main[slot])
            };
            (*idx, center)
        })
        .collect()
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "tb",
        Direction::LeftRight => "lr",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeKind;

    fn chain() -> FlowGraph {
        let mut graph = FlowGraph::new();
        for id in ["a", "b", "c"] {
            graph.ensure_node(id, NodeKind::Step);
        }
        graph.push_edge("a", "b", EdgeKind::Route);
        graph.push_edge("b", "c", EdgeKind::Route);
        graph
    }

    #[test]
    fn projects_grouped_endpoints_onto_groups() {
        let mut graph = chain();
        graph.ensure_node("g", NodeKind::Group);
        graph.ensure_node("inner", NodeKind::Step);
        graph.set_parent("inner", "g");
        graph.push_edge("c", "inner", EdgeKind::Route);
        graph.push_edge("inner", "inner", EdgeKind::Route);
        graph.push_edge("a", "missing", EdgeKind::Route);
        graph.push_edge("a", "b", EdgeKind::Route);
        let frames = Frames::build(&graph);
        let layered: HashSet<usize> = [0, 1, 2, 3].into_iter().collect();
        let edges = project_route_edges(&graph, &frames, &layered);
        assert_eq!(edges, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn tool_edges_do_not_drive_layers() {
        let mut graph = chain();
        graph.ensure_node("t", NodeKind::Tool);
        graph.push_edge("a", "t", EdgeKind::Tool);
        let frames = Frames::build(&graph);
        let layered: HashSet<usize> = [0, 1, 2].into_iter().collect();
        assert_eq!(project_route_edges(&graph, &frames, &layered).len(), 2);
    }

    #[test]
    fn layered_engine_separates_ranks() {
        let graph = chain();
        let frames = Frames::build(&graph);
        let mut config = LayoutConfig::default();
        config.engine = LayoutEngine::Layered;
        let sizes = vec![(240.0, 100.0); 3];
        let centers = layout_layers(&graph, &frames, &[0, 1, 2], &sizes, &config);
        assert!(centers[&0].1 + 100.0 <= centers[&1].1);
        assert!(centers[&1].1 + 100.0 <= centers[&2].1);
        assert_eq!(centers[&0].0, centers[&1].0);
    }

    #[test]
    fn layered_engine_keeps_siblings_apart() {
        let mut graph = FlowGraph::new();
        for id in ["root", "x", "y", "z"] {
            graph.ensure_node(id, NodeKind::Step);
        }
        for id in ["x", "y", "z"] {
            graph.push_edge("root", id, EdgeKind::Route);
        }
        let frames = Frames::build(&graph);
        let mut config = LayoutConfig::default();
        config.engine = LayoutEngine::Layered;
        let sizes = vec![(240.0, 100.0); 4];
        let centers = layout_layers(&graph, &frames, &[0, 1, 2, 3], &sizes, &config);
        let mut xs: Vec<f32> = [1, 2, 3].iter().map(|idx| centers[idx].0).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(xs[1] - xs[0] >= 240.0 + config.node_spacing - 0.01);
        assert!(xs[2] - xs[1] >= 240.0 + config.node_spacing - 0.01);
    }

    #[test]
    fn default_engine_ranks_converging_branches() {
        let mut graph = FlowGraph::new();
        for id in ["s0", "s1", "s4", "s5", "s6"] {
            graph.ensure_node(id, NodeKind::Step);
        }
        for (from, to) in [("s4", "s1"), ("s6", "s1"), ("s4", "s6"), ("s5", "s0"), ("s1", "s5")] {
            graph.push_edge(from, to, EdgeKind::Route);
        }
        let frames = Frames::build(&graph);
        let config = LayoutConfig::default();
        assert_eq!(config.engine, LayoutEngine::Layered);
        let sizes = vec![(240.0, 100.0); 5];
        let centers = layout_layers(&graph, &frames, &[0, 1, 2, 3, 4], &sizes, &config);
        assert_eq!(centers.len(), 5);
        // s4 -> s6 -> s1 -> s5 -> s0, one rank each
        let order = [2, 4, 1, 3, 0];
        for pair in order.windows(2) {
            assert!(centers[&pair[0]].1 + 100.0 + config.rank_spacing <= centers[&pair[1]].1 + 0.01);
        }
    }
}
