//! Automatic arrangement of agent flow graphs.
//!
//! Top-level steps and flow groups are layered top-to-bottom, group boxes are
//! fitted around their children, and tools are attached next to the steps
//! that use them. The whole pass is a pure function of its input.

mod frames;
pub mod geometry;
mod groups;
mod hierarchy;
mod ranking;
mod tools;
pub mod validate;

use serde::Serialize;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::{Dimension, FlowGraph, Node, NodeKind, Position};
use frames::Frames;
use geometry::{Rect, snap_position};

pub use validate::{LayoutIssue, check_layout};

/// Absolute placement of one node after layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBox {
    pub id: String,
    pub kind: NodeKind,
    /// Group the node is laid out in, when the parent link was honoured.
    pub parent: Option<String>,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct Layout {
    /// Input nodes in input order with new positions (relative to the parent
    /// group for grouped nodes) and new group sizes.
    pub nodes: Vec<Node>,
    /// Absolute rectangles, index-aligned with `nodes`.
    pub boxes: Vec<NodeBox>,
    /// Bounds of every box on the canvas.
    pub bounds: Rect,
}

impl Layout {
    pub fn width(&self) -> f32 {
        self.bounds.width
    }

    pub fn height(&self) -> f32 {
        self.bounds.height
    }

    pub fn node_box(&self, id: &str) -> Option<&NodeBox> {
        self.boxes.iter().find(|entry| entry.id == id)
    }
}

/// Footprint used for a node before group fitting.
pub fn node_size(node: &Node, config: &LayoutConfig) -> (f32, f32) {
    match node.kind {
        NodeKind::Tool => (config.tool_width, config.tool_height),
        NodeKind::Group => (
            node.style
                .width_px()
                .unwrap_or(config.default_group_width)
                .max(config.min_group_width),
            node.style
                .height_px()
                .unwrap_or(config.default_group_height)
                .max(config.min_group_height),
        ),
        NodeKind::Step | NodeKind::Other(_) => (config.step_width, config.step_height),
    }
}

pub fn compute_layout(graph: &FlowGraph, config: &LayoutConfig) -> Layout {
    let grid = config.grid_size;
    let frames = Frames::build(graph);
    let mut positions: Vec<Position> = graph.nodes.iter().map(|node| node.position).collect();
    let mut sizes: Vec<(f32, f32)> = graph
        .nodes
        .iter()
        .map(|node| node_size(node, config))
        .collect();

    for (idx, position) in positions.iter_mut().enumerate() {
        if frames.is_grouped(idx) || frames.is_duplicate(idx) {
            *position = snap_position(*position, grid);
        }
    }

    groups::tighten_groups(graph, &frames, &mut positions, &mut sizes, config);

    let layered: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(idx, node)| {
            !node.is_tool() && !frames.is_grouped(*idx) && !frames.is_duplicate(*idx)
        })
        .map(|(idx, _)| idx)
        .collect();
    let centers = hierarchy::layout_layers(graph, &frames, &layered, &sizes, config);
    for idx in &layered {
        let (width, height) = sizes[*idx];
        let top_left = match centers.get(idx) {
            Some((cx, cy)) => Position::new(cx - width / 2.0, cy - height / 2.0),
            None => positions[*idx],
        };
        positions[*idx] = snap_position(top_left, grid);
    }

    let rects = absolute_rects(graph, &frames, &positions, &sizes);
    let mut group_boxes = Vec::new();
    let mut step_boxes = Vec::new();
    let mut free_steps = Vec::new();
    for (idx, node) in graph.nodes.iter().enumerate() {
        let Some(rect) = rects[idx] else {
            continue;
        };
        if frames.is_duplicate(idx) {
            continue;
        }
        if node.is_group() {
            group_boxes.push(rect);
        } else {
            step_boxes.push(rect);
            if !frames.is_grouped(idx) {
                free_steps.push(rect);
            }
        }
    }
    let scene = tools::Scene {
        rects: &rects,
        group_boxes,
        step_boxes,
        free_step_bounds: Rect::enclosing(free_steps.iter()),
    };
    let tool_positions = tools::place_tools(graph, &frames, &scene, config);
    let mut tool_rects: Vec<Option<Rect>> = vec![None; graph.nodes.len()];
    for (idx, position) in tool_positions {
        positions[idx] = position;
        tool_rects[idx] = Some(Rect::at(position, sizes[idx].0, sizes[idx].1));
    }

    let mut nodes = Vec::with_capacity(graph.nodes.len());
    let mut boxes = Vec::with_capacity(graph.nodes.len());
    for (idx, node) in graph.nodes.iter().enumerate() {
        let mut laid_out = node.clone();
        laid_out.position = positions[idx];
        if node.is_group() && !frames.is_duplicate(idx) {
            let (width, height) = sizes[idx];
            laid_out.style.width = Some(Dimension::Number(width));
            laid_out.style.height = Some(Dimension::Number(height));
        }
        let rect = rects[idx]
            .or(tool_rects[idx])
            .unwrap_or_else(|| Rect::at(positions[idx], sizes[idx].0, sizes[idx].1));
        boxes.push(NodeBox {
            id: node.id.clone(),
            kind: node.kind.clone(),
            parent: frames.parent(idx).map(|parent| graph.nodes[parent].id.clone()),
            rect,
        });
        nodes.push(laid_out);
    }

    let bounds = Rect::enclosing(boxes.iter().map(|entry| &entry.rect)).unwrap_or_default();
    debug!(
        nodes = nodes.len(),
        width = bounds.width,
        height = bounds.height,
        "layout complete"
    );
    Layout {
        nodes,
        boxes,
        bounds,
    }
}

/// Returns a copy of `graph` with laid-out nodes and the input edges.
pub fn auto_layout(graph: &FlowGraph, config: &LayoutConfig) -> FlowGraph {
    let layout = compute_layout(graph, config);
    FlowGraph {
        nodes: layout.nodes,
        edges: graph.edges.clone(),
    }
}

/// Absolute rect for every non-tool node: relative positions are resolved by
/// walking up the honoured group parents.
fn absolute_rects(
    graph: &FlowGraph,
    frames: &Frames,
    positions: &[Position],
    sizes: &[(f32, f32)],
) -> Vec<Option<Rect>> {
    graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            if node.is_tool() {
                return None;
            }
            let mut x = positions[idx].x;
            let mut y = positions[idx].y;
            let mut current = idx;
            while let Some(parent) = frames.parent(current) {
                x += positions[parent].x;
                y += positions[parent].y;
                current = parent;
            }
            Some(Rect::new(x, y, sizes[idx].0, sizes[idx].1))
        })
        .collect()
}
