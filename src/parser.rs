use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::ir::{FlowGraph, Node};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("graph document is empty")]
    Empty,
    #[error("invalid graph document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid graph document: {0}")]
    Json5(#[from] json5::Error),
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
}

/// Either a full `{ nodes, edges }` document or a bare node array.
#[derive(Deserialize)]
#[serde(untagged)]
enum GraphDocument {
    Graph(FlowGraph),
    Nodes(Vec<Node>),
}

impl From<GraphDocument> for FlowGraph {
    fn from(document: GraphDocument) -> Self {
        match document {
            GraphDocument::Graph(graph) => graph,
            GraphDocument::Nodes(nodes) => FlowGraph {
                nodes,
                edges: Vec::new(),
            },
        }
    }
}

/// Parses an editor graph document. Strict JSON is tried first; hand-written
/// fixtures with comments or trailing commas go through JSON5.
pub fn parse_graph(input: &str) -> Result<FlowGraph, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let document: GraphDocument = match serde_json::from_str(trimmed) {
        Ok(document) => document,
        Err(json_err) => {
            debug!(error = %json_err, "strict JSON parse failed; retrying as JSON5");
            json5::from_str(trimmed).map_err(|json5_err| {
                if json_err.is_syntax() || json_err.is_eof() {
                    ParseError::Json5(json5_err)
                } else {
                    ParseError::Json(json_err)
                }
            })?
        }
    };
    let graph = FlowGraph::from(document);

    let mut seen: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(ParseError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EdgeKind, NodeKind};

    #[test]
    fn parses_editor_document() {
        let input = r#"{
            "nodes": [
                {"id": "flow", "type": "group", "position": {"x": 0, "y": 0}, "style": {"width": 500, "height": 300}},
                {"id": "start", "type": "step", "parentId": "flow", "position": {"x": 40, "y": 40}, "data": {"label": "Start"}},
                {"id": "search", "type": "tool", "position": {"x": 0, "y": 0}, "selected": true}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "search", "type": "tool", "animated": true}
            ]
        }"#;
        let graph = parse_graph(input).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.nodes[0].kind, NodeKind::Group);
        assert_eq!(graph.nodes[1].parent_id.as_deref(), Some("flow"));
        assert_eq!(graph.nodes[1].data["label"], "Start");
        assert_eq!(graph.nodes[2].extra["selected"], true);
        assert_eq!(graph.edges[0].kind, EdgeKind::Tool);
        assert_eq!(graph.edges[0].extra["animated"], true);
    }

    #[test]
    fn accepts_json5_fixtures() {
        let input = r#"{
            // steps only
            nodes: [
                {id: 'a', type: 'step'},
                {id: 'b', type: 'step',},
            ],
            edges: [{source: 'a', target: 'b', type: 'route'}],
        }"#;
        let graph = parse_graph(input).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn accepts_bare_node_arrays() {
        let graph = parse_graph(r#"[{"id":"a"},{"id":"b","type":"tool"}]"#).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].kind, NodeKind::Step);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn rejects_duplicates_and_empty_input() {
        let err = parse_graph(r#"{"nodes":[{"id":"a"},{"id":"a"}]}"#).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateNode(ref id) if id == "a"));
        assert!(matches!(parse_graph("   "), Err(ParseError::Empty)));
        assert!(parse_graph("{nodes: [").is_err());
    }

    #[test]
    fn accepts_legacy_parent_node_field() {
        let graph = parse_graph(r#"{"nodes":[{"id":"g","type":"group"},{"id":"s","parentNode":"g"}]}"#).unwrap();
        assert_eq!(graph.nodes[1].parent_id.as_deref(), Some("g"));
    }
}
