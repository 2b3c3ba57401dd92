use tracing::{debug, trace};

use super::frames::Frames;
use super::geometry::{Rect, snap_position, snap_to_grid, snap_up_to_grid};
use crate::config::LayoutConfig;
use crate::ir::{EdgeKind, FlowGraph, NodeKind, Position};

/// Absolute rectangles of everything laid out before tools.
pub(crate) struct Scene<'a> {
    /// Absolute rect per node index; `None` for tools and duplicates.
    pub rects: &'a [Option<Rect>],
    pub group_boxes: Vec<Rect>,
    pub step_boxes: Vec<Rect>,
    /// Union of the free (ungrouped) step rects.
    pub free_step_bounds: Option<Rect>,
}

impl Scene<'_> {
    fn blocked(&self, rect: &Rect) -> bool {
        self.group_boxes.iter().any(|group| rect.intersects(group))
            || self.step_boxes.iter().any(|step| rect.intersects(step))
    }

    fn content_bounds(&self) -> Option<Rect> {
        Rect::enclosing(self.group_boxes.iter().chain(self.step_boxes.iter()))
    }
}

/// Fallback area for tools without a usable anchor: a small grid just right
/// of the free steps. The cursor is shared by every fallback placement in one
/// pass.
struct FallbackGrid {
    origin: Position,
    cell_width: f32,
    cell_height: f32,
    columns: usize,
    cursor: usize,
}

impl FallbackGrid {
    fn new(scene: &Scene<'_>, config: &LayoutConfig) -> Self {
        let grid = config.grid_size;
        let bounds = scene
            .free_step_bounds
            .or_else(|| scene.content_bounds())
            .unwrap_or_default();
        let origin = Position::new(
            snap_up_to_grid(bounds.right() + config.tools.gap, grid),
            snap_to_grid(bounds.y, grid),
        );
        Self {
            origin,
            cell_width: config.tool_width + config.tools.separation,
            cell_height: config.tool_height + config.tools.separation,
            columns: config.tools.fallback_columns.max(1),
            cursor: 0,
        }
    }

    fn cell(&self, slot: usize, grid: f32) -> Position {
        let col = slot % self.columns;
        let row = slot / self.columns;
        snap_position(
            Position::new(
                self.origin.x + col as f32 * self.cell_width,
                self.origin.y + row as f32 * self.cell_height,
            ),
            grid,
        )
    }

    fn next(&mut self, scene: &Scene<'_>, placed: &[Rect], config: &LayoutConfig) -> Position {
        let (width, height) = (config.tool_width, config.tool_height);
        for _ in 0..config.tools.fallback_attempts {
            let candidate = self.cell(self.cursor, config.grid_size);
            self.cursor += 1;
            let rect = Rect::at(candidate, width, height);
            if scene.blocked(&rect) || placed.iter().any(|other| rect.intersects(other)) {
                trace!(x = candidate.x, y = candidate.y, "fallback cell rejected");
                continue;
            }
            return candidate;
        }
        debug!("fallback grid exhausted; placing tool beyond the canvas");
        beyond_content(scene, placed, self.origin.y, config)
    }
}

/// A position strictly right of every obstacle and placed tool.
fn beyond_content(scene: &Scene<'_>, placed: &[Rect], y: f32, config: &LayoutConfig) -> Position {
    let grid = config.grid_size;
    let right = scene
        .content_bounds()
        .into_iter()
        .chain(placed.iter().copied())
        .map(|rect| rect.right())
        .fold(f32::NEG_INFINITY, f32::max);
    let x = if right.is_finite() {
        snap_up_to_grid(right + config.tools.gap, grid)
    } else {
        0.0
    };
    Position::new(x, snap_to_grid(y, grid))
}

/// Offsets tried around an anchor step: right, below, above, further right.
fn anchor_candidates(anchor: &Rect, config: &LayoutConfig) -> [Position; 4] {
    let gap = config.tools.gap;
    let (width, height) = (config.tool_width, config.tool_height);
    [
        Position::new(anchor.right() + gap, anchor.y),
        Position::new(anchor.x, anchor.bottom() + gap),
        Position::new(anchor.x, anchor.y - height - gap),
        Position::new(anchor.right() + gap * 2.0 + width, anchor.y),
    ]
}

/// Offsets tried when a tool overlaps one placed before it.
fn repair_candidates(from: Position, config: &LayoutConfig) -> Vec<Position> {
    let step_x = config.tool_width + config.tools.separation;
    let step_y = config.tool_height + config.tools.separation;
    let mut candidates = vec![
        Position::new(from.x + step_x, from.y),
        Position::new(from.x, from.y + step_y),
        Position::new(from.x + step_x, from.y + step_y),
    ];
    for k in 2..=config.tools.repair_attempts.max(2) {
        candidates.push(Position::new(from.x, from.y + step_y * k as f32));
    }
    candidates
}

/// The step a tool hangs off: source of the first incoming `tool` edge whose
/// source is a known step. Route and unknown edges never anchor a tool.
fn anchor_of(graph: &FlowGraph, frames: &Frames, scene: &Scene<'_>, tool_idx: usize) -> Option<Rect> {
    let tool_id = graph.nodes[tool_idx].id.as_str();
    graph
        .edges
        .iter()
        .filter(|edge| edge.kind == EdgeKind::Tool && edge.target == tool_id)
        .find_map(|edge| {
            let source = frames.index_of(&edge.source)?;
            match graph.nodes[source].kind {
                NodeKind::Tool | NodeKind::Group => None,
                NodeKind::Step | NodeKind::Other(_) => scene.rects[source],
            }
        })
}

/// Places every tool node and returns `(node index, absolute position)` in
/// node order.
pub(crate) fn place_tools(
    graph: &FlowGraph,
    frames: &Frames,
    scene: &Scene<'_>,
    config: &LayoutConfig,
) -> Vec<(usize, Position)> {
    let grid = config.grid_size;
    let (width, height) = (config.tool_width, config.tool_height);
    let tools: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(idx, node)| node.is_tool() && !frames.is_duplicate(*idx))
        .map(|(idx, _)| idx)
        .collect();
    if tools.is_empty() {
        return Vec::new();
    }

    let mut fallback = FallbackGrid::new(scene, config);
    let mut initial: Vec<Position> = Vec::with_capacity(tools.len());
    let mut initial_rects: Vec<Rect> = Vec::with_capacity(tools.len());
    for tool_idx in &tools {
        let id = graph.nodes[*tool_idx].id.as_str();
        let anchored = anchor_of(graph, frames, scene, *tool_idx).and_then(|anchor| {
            let chosen = anchor_candidates(&anchor, config)
                .into_iter()
                .map(|candidate| snap_position(candidate, grid))
                .find(|candidate| {
                    let rect = Rect::at(*candidate, width, height);
                    !scene.group_boxes.iter().any(|group| rect.intersects(group))
                });
            if chosen.is_none() {
                debug!(id, "no clear slot around anchor; using fallback area");
            }
            chosen
        });
        let position = match anchored {
            Some(candidate) => candidate,
            None => fallback.next(scene, &initial_rects, config),
        };
        initial.push(position);
        initial_rects.push(Rect::at(position, width, height));
    }

    // Resolve overlaps against tools placed earlier in this pass.
    let margin = config.tools.separation;
    let mut placed: Vec<Rect> = Vec::with_capacity(tools.len());
    let mut result = Vec::with_capacity(tools.len());
    for (tool_idx, position) in tools.iter().zip(initial) {
        let rect = Rect::at(position, width, height);
        let clear = |rect: &Rect, placed: &[Rect]| {
            !scene.group_boxes.iter().any(|group| rect.intersects(group))
                && !placed.iter().any(|other| rect.overlaps_with_margin(other, margin))
        };
        let final_position = if clear(&rect, &placed) {
            position
        } else {
            let nudged = repair_candidates(position, config)
                .into_iter()
                .map(|candidate| snap_position(candidate, grid))
                .find(|candidate| {
                    let moved = Rect::at(*candidate, width, height);
                    clear(&moved, &placed) && !scene.blocked(&moved)
                });
            match nudged {
                Some(candidate) => candidate,
                None => {
                    debug!(id = %graph.nodes[*tool_idx].id, "overlap repair failed; moving tool beyond the canvas");
                    beyond_content(scene, &placed, position.y, config)
                }
            }
        };
        placed.push(Rect::at(final_position, width, height));
        result.push((*tool_idx, final_position));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Node;

    fn scene_with<'a>(rects: &'a [Option<Rect>], groups: Vec<Rect>, steps: Vec<Rect>) -> Scene<'a> {
        let free_step_bounds = Rect::enclosing(steps.iter());
        Scene {
            rects,
            group_boxes: groups,
            step_boxes: steps,
            free_step_bounds,
        }
    }

    #[test]
    fn anchored_tool_prefers_right_of_step() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("s", NodeKind::Step);
        graph.ensure_node("t", NodeKind::Tool);
        graph.push_edge("s", "t", EdgeKind::Tool);
        let frames = Frames::build(&graph);
        let step = Rect::new(0.0, 0.0, 240.0, 100.0);
        let rects = vec![Some(step), None];
        let scene = scene_with(&rects, Vec::new(), vec![step]);
        let placed = place_tools(&graph, &frames, &scene, &LayoutConfig::default());
        assert_eq!(placed, vec![(1, Position::new(300.0, 0.0))]);
    }

    #[test]
    fn anchored_tool_skips_candidates_inside_groups() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("s", NodeKind::Step);
        graph.ensure_node("t", NodeKind::Tool);
        graph.push_edge("s", "t", EdgeKind::Tool);
        let frames = Frames::build(&graph);
        let step = Rect::new(0.0, 200.0, 240.0, 100.0);
        let blocker = Rect::new(280.0, 160.0, 400.0, 200.0);
        let rects = vec![Some(step), None];
        let scene = scene_with(&rects, vec![blocker], vec![step]);
        let placed = place_tools(&graph, &frames, &scene, &LayoutConfig::default());
        // right is blocked, below is free
        assert_eq!(placed, vec![(1, Position::new(0.0, 360.0))]);
    }

    #[test]
    fn route_edges_do_not_anchor_tools() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("s", NodeKind::Step);
        graph.ensure_node("t", NodeKind::Tool);
        graph.ensure_node("u", NodeKind::Tool);
        graph.push_edge("s", "t", EdgeKind::Route);
        graph.push_edge("s", "u", EdgeKind::Other("annotation".to_string()));
        let frames = Frames::build(&graph);
        let step = Rect::new(0.0, 200.0, 240.0, 100.0);
        let rects = vec![Some(step), None, None];
        let scene = scene_with(&rects, Vec::new(), vec![step]);
        let placed = place_tools(&graph, &frames, &scene, &LayoutConfig::default());
        // both go to the fallback grid, whose first row starts at the step's top
        assert_eq!(
            placed,
            vec![(1, Position::new(300.0, 200.0)), (2, Position::new(500.0, 200.0))]
        );
    }

    #[test]
    fn unconnected_tools_fill_the_fallback_grid() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("s", NodeKind::Step);
        for id in ["t1", "t2", "t3", "t4"] {
            graph.nodes.push(Node::new(id, NodeKind::Tool));
        }
        let frames = Frames::build(&graph);
        let step = Rect::new(0.0, 0.0, 240.0, 100.0);
        let rects = vec![Some(step), None, None, None, None];
        let scene = scene_with(&rects, Vec::new(), vec![step]);
        let placed = place_tools(&graph, &frames, &scene, &LayoutConfig::default());
        let positions: Vec<Position> = placed.iter().map(|(_, p)| *p).collect();
        assert_eq!(
            positions,
            vec![
                Position::new(300.0, 0.0),
                Position::new(500.0, 0.0),
                Position::new(700.0, 0.0),
                Position::new(300.0, 80.0),
            ]
        );
    }

    #[test]
    fn overlapping_tools_are_nudged_apart() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("s", NodeKind::Step);
        graph.ensure_node("t1", NodeKind::Tool);
        graph.ensure_node("t2", NodeKind::Tool);
        graph.push_edge("s", "t1", EdgeKind::Tool);
        graph.push_edge("s", "t2", EdgeKind::Tool);
        let frames = Frames::build(&graph);
        let step = Rect::new(0.0, 0.0, 240.0, 100.0);
        let rects = vec![Some(step), None, None];
        let scene = scene_with(&rects, Vec::new(), vec![step]);
        let config = LayoutConfig::default();
        let placed = place_tools(&graph, &frames, &scene, &config);
        let a = Rect::at(placed[0].1, config.tool_width, config.tool_height);
        let b = Rect::at(placed[1].1, config.tool_width, config.tool_height);
        assert!(!a.overlaps_with_margin(&b, config.tools.separation));
        assert_eq!(placed[0].1, Position::new(300.0, 0.0));
        assert_eq!(placed[1].1, Position::new(500.0, 0.0));
    }

    #[test]
    fn exhausted_fallback_moves_beyond_groups() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("t", NodeKind::Tool);
        let frames = Frames::build(&graph);
        let wall = Rect::new(-100.0, -100.0, 3000.0, 3000.0);
        let rects = vec![None];
        let scene = scene_with(&rects, vec![wall], Vec::new());
        let placed = place_tools(&graph, &frames, &scene, &LayoutConfig::default());
        let rect = Rect::at(placed[0].1, 180.0, 60.0);
        assert!(!rect.intersects(&wall));
    }
}
