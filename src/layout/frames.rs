use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ir::FlowGraph;

/// Resolved ownership of the graph: node id lookup plus the parent links the
/// layout honours (group parents only, tools never grouped, no cycles).
#[derive(Debug, Clone)]
pub(crate) struct Frames {
    index: HashMap<String, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    duplicate: Vec<bool>,
}

impl Frames {
    pub(crate) fn build(graph: &FlowGraph) -> Self {
        let count = graph.nodes.len();
        let mut index: HashMap<String, usize> = HashMap::with_capacity(count);
        let mut duplicate = vec![false; count];
        for (idx, node) in graph.nodes.iter().enumerate() {
            if index.contains_key(&node.id) {
                warn!(id = %node.id, "duplicate node id; later copy keeps its position");
                duplicate[idx] = true;
                continue;
            }
            index.insert(node.id.clone(), idx);
        }

        let mut parent: Vec<Option<usize>> = vec![None; count];
        for (idx, node) in graph.nodes.iter().enumerate() {
            if duplicate[idx] {
                continue;
            }
            let Some(parent_id) = node.parent_id.as_deref() else {
                continue;
            };
            if node.is_tool() {
                debug!(id = %node.id, "tool nodes are never grouped; ignoring parent");
                continue;
            }
            let Some(&parent_idx) = index.get(parent_id) else {
                debug!(id = %node.id, parent = parent_id, "parent not found; treating node as free");
                continue;
            };
            if !graph.nodes[parent_idx].is_group() {
                warn!(id = %node.id, parent = parent_id, "parent is not a group; treating node as free");
                continue;
            }
            if closes_cycle(&parent, idx, parent_idx) {
                warn!(id = %node.id, parent = parent_id, "cyclic group nesting; treating node as free");
                continue;
            }
            parent[idx] = Some(parent_idx);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (idx, link) in parent.iter().enumerate() {
            if let Some(parent_idx) = link {
                children[*parent_idx].push(idx);
            }
        }

        Self {
            index,
            parent,
            children,
            duplicate,
        }
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn parent(&self, idx: usize) -> Option<usize> {
        self.parent.get(idx).copied().flatten()
    }

    pub(crate) fn children(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn is_duplicate(&self, idx: usize) -> bool {
        self.duplicate.get(idx).copied().unwrap_or(false)
    }

    pub(crate) fn is_grouped(&self, idx: usize) -> bool {
        self.parent(idx).is_some()
    }

    /// Outermost group containing `idx`, or `idx` itself when free.
    pub(crate) fn top_level(&self, idx: usize) -> usize {
        let mut current = idx;
        while let Some(parent_idx) = self.parent(current) {
            current = parent_idx;
        }
        current
    }

    pub(crate) fn depth(&self, idx: usize) -> usize {
        let mut depth = 0;
        let mut current = idx;
        while let Some(parent_idx) = self.parent(current) {
            depth += 1;
            current = parent_idx;
        }
        depth
    }
}

fn closes_cycle(parent: &[Option<usize>], child: usize, candidate: usize) -> bool {
    let mut current = Some(candidate);
    while let Some(idx) = current {
        if idx == child {
            return true;
        }
        current = parent[idx];
    }
    false
}
