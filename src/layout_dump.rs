use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, NodeKind};
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Flat, absolute-coordinate view of a layout for debugging.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub direction: String,
    pub grid: f32,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub groups: Vec<GroupDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub parent: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub kind: String,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct GroupDump {
    pub id: String,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, graph: &FlowGraph, config: &LayoutConfig) -> Self {
        let nodes = layout
            .boxes
            .iter()
            .map(|entry| NodeDump {
                id: entry.id.clone(),
                kind: String::from(entry.kind.clone()),
                parent: entry.parent.clone(),
                x: entry.rect.x,
                y: entry.rect.y,
                width: entry.rect.width,
                height: entry.rect.height,
            })
            .collect();

        // dangling edges have no endpoints to draw and are left out
        let edges = graph
            .edges
            .iter()
            .filter_map(|edge| {
                let from = layout.node_box(&edge.source)?;
                let to = layout.node_box(&edge.target)?;
                let (x1, y1) = from.rect.center();
                let (x2, y2) = to.rect.center();
                Some(EdgeDump {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    kind: String::from(edge.kind.clone()),
                    points: vec![[x1, y1], [x2, y2]],
                })
            })
            .collect();

        let groups = layout
            .boxes
            .iter()
            .filter(|entry| entry.kind == NodeKind::Group)
            .map(|group| GroupDump {
                id: group.id.clone(),
                nodes: layout
                    .boxes
                    .iter()
                    .filter(|entry| entry.parent.as_deref() == Some(group.id.as_str()))
                    .map(|entry| entry.id.clone())
                    .collect(),
                x: group.rect.x,
                y: group.rect.y,
                width: group.rect.width,
                height: group.rect.height,
            })
            .collect();

        LayoutDump {
            direction: format!("{:?}", config.direction),
            grid: config.grid_size,
            width: layout.width(),
            height: layout.height(),
            nodes,
            edges,
            groups,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    layout: &Layout,
    graph: &FlowGraph,
    config: &LayoutConfig,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, graph, config);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::EdgeKind;
    use crate::layout::compute_layout;

    #[test]
    fn dump_lists_group_members_and_skips_dangling_edges() {
        let mut graph = FlowGraph::new();
        graph.ensure_node("g", NodeKind::Group);
        graph.ensure_node("s", NodeKind::Step);
        graph.set_parent("s", "g");
        graph.push_edge("s", "missing", EdgeKind::Route);
        let config = LayoutConfig::default();
        let layout = compute_layout(&graph, &config);
        let dump = LayoutDump::from_layout(&layout, &graph, &config);
        assert_eq!(dump.nodes.len(), 2);
        assert!(dump.edges.is_empty());
        assert_eq!(dump.groups.len(), 1);
        assert_eq!(dump.groups[0].nodes, vec!["s".to_string()]);
        assert_eq!(dump.nodes[1].kind, "step");
    }
}
