use thiserror::Error;

use super::Layout;
use super::geometry::is_on_grid;
use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, NodeKind};

/// A broken layout property, as reported by [`check_layout`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutIssue {
    #[error("output node list does not match the input node ids")]
    IdentityMismatch,
    #[error("node '{id}' is off the {grid} unit grid")]
    OffGrid { id: String, grid: f32 },
    #[error("top-level nodes '{first}' and '{second}' overlap")]
    TopLevelOverlap { first: String, second: String },
    #[error("node '{id}' escapes its group '{group}'")]
    OutsideGroup { id: String, group: String },
    #[error("tool '{tool}' intersects group '{group}'")]
    ToolOverGroup { tool: String, group: String },
    #[error("group '{id}' is smaller than the minimum size")]
    GroupTooSmall { id: String },
}

/// Checks a computed layout against the properties every auto-arranged graph
/// is expected to keep. An empty result means the layout is clean.
pub fn check_layout(graph: &FlowGraph, layout: &Layout, config: &LayoutConfig) -> Vec<LayoutIssue> {
    let mut issues = Vec::new();

    let same_ids = graph.nodes.len() == layout.nodes.len()
        && graph
            .nodes
            .iter()
            .zip(&layout.nodes)
            .all(|(input, output)| input.id == output.id);
    if !same_ids || layout.boxes.len() != layout.nodes.len() {
        issues.push(LayoutIssue::IdentityMismatch);
        return issues;
    }

    let grid = config.grid_size;
    for node in &layout.nodes {
        if !is_on_grid(node.position.x, grid) || !is_on_grid(node.position.y, grid) {
            issues.push(LayoutIssue::OffGrid {
                id: node.id.clone(),
                grid,
            });
        }
    }

    let top_level: Vec<_> = layout
        .boxes
        .iter()
        .filter(|entry| entry.parent.is_none() && entry.kind != NodeKind::Tool)
        .collect();
    for (i, first) in top_level.iter().enumerate() {
        for second in &top_level[i + 1..] {
            if first.rect.intersects(&second.rect) {
                issues.push(LayoutIssue::TopLevelOverlap {
                    first: first.id.clone(),
                    second: second.id.clone(),
                });
            }
        }
    }

    for entry in &layout.boxes {
        let Some(parent_id) = entry.parent.as_deref() else {
            continue;
        };
        let Some(parent) = layout.node_box(parent_id) else {
            continue;
        };
        if !parent.rect.contains(&entry.rect) {
            issues.push(LayoutIssue::OutsideGroup {
                id: entry.id.clone(),
                group: parent_id.to_string(),
            });
        }
    }

    let groups: Vec<_> = layout
        .boxes
        .iter()
        .filter(|entry| entry.kind == NodeKind::Group)
        .collect();
    for group in &groups {
        if group.rect.width < config.min_group_width || group.rect.height < config.min_group_height {
            issues.push(LayoutIssue::GroupTooSmall {
                id: group.id.clone(),
            });
        }
    }
    for tool in layout.boxes.iter().filter(|entry| entry.kind == NodeKind::Tool) {
        for group in &groups {
            if tool.rect.intersects(&group.rect) {
                issues.push(LayoutIssue::ToolOverGroup {
                    tool: tool.id.clone(),
                    group: group.id.clone(),
                });
            }
        }
    }

    issues
}
