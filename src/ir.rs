use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB", alias = "TD")]
    TopDown,
    #[serde(rename = "LR")]
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "LR" => Some(Self::LeftRight),
            _ => None,
        }
    }
}

/// Node type as stored in the editor document (`type` field).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    #[default]
    Step,
    Tool,
    Group,
    /// Any other node type; laid out with the step footprint.
    Other(String),
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "step" => Self::Step,
            "tool" => Self::Tool,
            "group" => Self::Group,
            _ => Self::Other(value),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Step => "step".to_string(),
            NodeKind::Tool => "tool".to_string(),
            NodeKind::Group => "group".to_string(),
            NodeKind::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeKind {
    #[default]
    Route,
    Tool,
    Other(String),
}

impl From<String> for EdgeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "route" => Self::Route,
            "tool" => Self::Tool,
            _ => Self::Other(value),
        }
    }
}

impl From<EdgeKind> for String {
    fn from(kind: EdgeKind) -> Self {
        match kind {
            EdgeKind::Route => "route".to_string(),
            EdgeKind::Tool => "tool".to_string(),
            EdgeKind::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Style dimension as written by the editor: either a number or a CSS
/// length such as `"320px"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Number(f32),
    Text(String),
}

impl Dimension {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Dimension::Number(val) => Some(*val),
            Dimension::Text(val) => val.trim().trim_end_matches("px").trim().parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeStyle {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.extra.is_empty()
    }

    /// Declared width, ignoring unparsable or non-positive values.
    pub fn width_px(&self) -> Option<f32> {
        self.width.as_ref().and_then(Dimension::as_f32).filter(|w| *w > 0.0)
    }

    pub fn height_px(&self) -> Option<f32> {
        self.height.as_ref().and_then(Dimension::as_f32).filter(|h| *h > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default, alias = "parentNode", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "NodeStyle::is_empty")]
    pub style: NodeStyle,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: &str, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            parent_id: None,
            position: Position::default(),
            style: NodeStyle::default(),
            data: Value::Null,
            extra: Map::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    pub fn is_tool(&self) -> bool {
        self.kind == NodeKind::Tool
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    pub fn new(source: &str, target: &str, kind: EdgeKind) -> Self {
        let id = format!("{}-{}", source, target);
        Self {
            id,
            source: source.to_string(),
            target: target.to_string(),
            kind,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Returns the node with `id`, inserting a fresh one of `kind` when absent.
    pub fn ensure_node(&mut self, id: &str, kind: NodeKind) -> &mut Node {
        let idx = match self.nodes.iter().position(|node| node.id == id) {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node::new(id, kind));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[idx]
    }

    pub fn push_edge(&mut self, source: &str, target: &str, kind: EdgeKind) {
        self.edges.push(Edge::new(source, target, kind));
    }

    pub fn set_parent(&mut self, id: &str, parent: &str) {
        if let Some(node) = self.nodes.iter_mut().find(|node| node.id == id) {
            node.parent_id = Some(parent.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_keeps_unknown_types() {
        let node: Node = serde_json::from_str(r#"{"id":"x","type":"note"}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Other("note".to_string()));
        let out = serde_json::to_value(&node).unwrap();
        assert_eq!(out["type"], "note");
    }

    #[test]
    fn style_dimensions_accept_css_lengths() {
        let node: Node = serde_json::from_str(
            r#"{"id":"g","type":"group","style":{"width":"320px","height":240,"background":"red"}}"#,
        )
        .unwrap();
        assert_eq!(node.style.width_px(), Some(320.0));
        assert_eq!(node.style.height_px(), Some(240.0));
        assert_eq!(node.style.extra["background"], "red");
    }
}
