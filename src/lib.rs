#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use ir::{Edge, EdgeKind, FlowGraph, Node, NodeKind, Position};
pub use layout::{Layout, LayoutIssue, auto_layout, check_layout, compute_layout};
pub use parser::{ParseError, parse_graph};

/// Parses a graph document, lays it out and returns the laid-out document as
/// JSON. `options` is an optional config JSON merged over the defaults.
pub fn layout_document(input: &str, options: Option<&str>) -> anyhow::Result<String> {
    let mut config = Config::default();
    if let Some(raw) = options.filter(|raw| !raw.trim().is_empty()) {
        config = config::merge_config_json(config, raw)?;
    }
    let graph = parse_graph(input)?;
    let laid_out = auto_layout(&graph, &config.layout);
    Ok(serde_json::to_string(&laid_out)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_document_round_trips_through_json() {
        let input = r#"{"nodes":[{"id":"a","type":"step"},{"id":"b","type":"step"}],
            "edges":[{"id":"a-b","source":"a","target":"b","type":"route"}]}"#;
        let output = layout_document(input, Some(r#"{"layout":{"gridSize":10}}"#)).unwrap();
        let graph = parse_graph(&output).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges[0].id, "a-b");
        assert!(graph.nodes[1].position.y > graph.nodes[0].position.y);
    }

    #[test]
    fn layout_document_reports_bad_options() {
        assert!(layout_document(r#"{"nodes":[]}"#, Some("{not json")).is_err());
    }
}
