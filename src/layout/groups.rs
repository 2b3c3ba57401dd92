use tracing::trace;

use super::frames::Frames;
use super::geometry::{Rect, snap_down_to_grid, snap_up_to_grid};
use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, Position};

/// Shrinks every group to enclose its children plus padding.
///
/// Groups are handled deepest first so a nested group contributes its
/// tightened box to its parent. When a box moves inside its frame, the
/// children's relative positions are shifted by the same amount, which keeps
/// their absolute canvas position. `positions` must already hold grid-aligned
/// relative positions for grouped nodes; `sizes` receives the new group sizes.
pub(crate) fn tighten_groups(
    graph: &FlowGraph,
    frames: &Frames,
    positions: &mut [Position],
    sizes: &mut [(f32, f32)],
    config: &LayoutConfig,
) {
    let mut groups: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(idx, node)| node.is_group() && !frames.is_duplicate(*idx))
        .map(|(idx, _)| idx)
        .collect();
    groups.sort_by_key(|idx| std::cmp::Reverse(frames.depth(*idx)));

    let grid = config.grid_size;
    let pad = config.group_padding.max(0.0);
    let min_width = config.min_group_width.max(grid);
    let min_height = config.min_group_height.max(grid);

    for group_idx in groups {
        let children = frames.children(group_idx);
        let child_rects: Vec<Rect> = children
            .iter()
            .map(|child| {
                let (width, height) = sizes[*child];
                Rect::at(positions[*child], width, height)
            })
            .collect();
        let Some(bounds) = Rect::enclosing(child_rects.iter()) else {
            trace!(id = %graph.nodes[group_idx].id, "empty group keeps its frame");
            sizes[group_idx] = (
                snap_up_to_grid(min_width, grid),
                snap_up_to_grid(min_height, grid),
            );
            continue;
        };

        let left = snap_down_to_grid(bounds.x - pad, grid);
        let top = snap_down_to_grid(bounds.y - pad, grid);
        let width = snap_up_to_grid((bounds.right() + pad - left).max(min_width), grid);
        let height = snap_up_to_grid((bounds.bottom() + pad - top).max(min_height), grid);

        for child in children {
            positions[*child].x -= left;
            positions[*child].y -= top;
        }
        positions[group_idx].x += left;
        positions[group_idx].y += top;
        sizes[group_idx] = (width, height);
        trace!(
            id = %graph.nodes[group_idx].id,
            width,
            height,
            "tightened group"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeKind;

    fn setup() -> (FlowGraph, LayoutConfig) {
        let mut graph = FlowGraph::new();
        graph.ensure_node("g", NodeKind::Group).position = Position::new(100.0, 100.0);
        graph.ensure_node("a", NodeKind::Step).position = Position::new(200.0, 100.0);
        graph.ensure_node("b", NodeKind::Step).position = Position::new(200.0, 300.0);
        graph.set_parent("a", "g");
        graph.set_parent("b", "g");
        (graph, LayoutConfig::default())
    }

    #[test]
    fn fits_children_with_padding_and_preserves_absolute_positions() {
        let (graph, config) = setup();
        let frames = Frames::build(&graph);
        let mut positions: Vec<Position> = graph.nodes.iter().map(|n| n.position).collect();
        let mut sizes = vec![(400.0, 300.0), (240.0, 100.0), (240.0, 100.0)];
        let before_a = (
            positions[0].x + positions[1].x,
            positions[0].y + positions[1].y,
        );

        tighten_groups(&graph, &frames, &mut positions, &mut sizes, &config);

        assert_eq!(positions[1], Position::new(40.0, 40.0));
        assert_eq!(positions[2], Position::new(40.0, 240.0));
        assert_eq!(sizes[0], (320.0, 380.0));
        let after_a = (
            positions[0].x + positions[1].x,
            positions[0].y + positions[1].y,
        );
        assert_eq!(before_a, after_a);
    }

    #[test]
    fn empty_group_gets_minimum_size_and_keeps_position() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("g", NodeKind::Group).position = Position::new(60.0, 80.0);
        let frames = Frames::build(&graph);
        let mut positions = vec![Position::new(60.0, 80.0)];
        let mut sizes = vec![(900.0, 900.0)];
        let config = LayoutConfig::default();
        tighten_groups(&graph, &frames, &mut positions, &mut sizes, &config);
        assert_eq!(positions[0], Position::new(60.0, 80.0));
        assert_eq!(sizes[0], (300.0, 200.0));
    }

    #[test]
    fn never_shrinks_below_minimum() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("g", NodeKind::Group);
        graph.ensure_node("t", NodeKind::Step).position = Position::new(0.0, 0.0);
        graph.set_parent("t", "g");
        let frames = Frames::build(&graph);
        let mut positions = vec![Position::default(), Position::default()];
        let mut sizes = vec![(0.0, 0.0), (40.0, 20.0)];
        tighten_groups(&graph, &frames, &mut positions, &mut sizes, &LayoutConfig::default());
        assert_eq!(sizes[0], (300.0, 200.0));
    }
}
