use flow_autolayout::config::{Config, merge_config_json};
use flow_autolayout::ir::Direction;
use flow_autolayout::{auto_layout, parse_graph};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// Options the editor passes alongside the graph. `direction` and `gridSize`
/// are shorthands; `config` takes the full config file shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowLayoutOptions {
    direction: Option<String>,
    grid_size: Option<f32>,
    config: Option<serde_json::Value>,
}

fn build_config(options: FlowLayoutOptions) -> Result<Config, String> {
    let mut config = Config::default();
    if let Some(raw) = options.config {
        config = merge_config_json(config, &raw.to_string()).map_err(|error| error.to_string())?;
    }
    if let Some(token) = options.direction.as_deref() {
        config.layout.direction =
            Direction::from_token(token).ok_or_else(|| format!("Unknown layout direction: {token}"))?;
    }
    if let Some(grid) = options.grid_size {
        if grid <= 0.0 {
            return Err("gridSize must be positive".to_string());
        }
        config.layout.grid_size = grid;
    }
    Ok(config)
}

fn layout_flow_inner(graph_json: &str, options_json: Option<String>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str::<FlowLayoutOptions>(&raw).map_err(|error| error.to_string())?
        }
        _ => FlowLayoutOptions::default(),
    };
    let config = build_config(options)?;
    let graph = parse_graph(graph_json).map_err(|error| error.to_string())?;
    let laid_out = auto_layout(&graph, &config.layout);
    serde_json::to_string(&laid_out).map_err(|error| error.to_string())
}

/// Lays out an editor graph document and returns it with new positions and
/// group sizes.
#[wasm_bindgen]
pub fn layout_flow(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_flow_inner(graph_json, options_json).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use flow_autolayout::parse_graph;

    use crate::{FlowLayoutOptions, build_config, layout_flow_inner};

    #[test]
    fn lays_out_grouped_flow_with_tool() {
        let graph = r#"{
            "nodes": [
                {"id": "G", "type": "group", "position": {"x": 0, "y": 0}},
                {"id": "S", "type": "step", "parentId": "G", "position": {"x": 13, "y": 7}},
                {"id": "T", "type": "tool", "position": {"x": 0, "y": 0}}
            ],
            "edges": [{"id": "S-T", "source": "S", "target": "T", "type": "tool"}]
        }"#;

        let output = layout_flow_inner(graph, None).expect("grouped flow should lay out");
        let laid_out = parse_graph(&output).expect("output should parse");

        assert_eq!(laid_out.nodes.len(), 3);
        assert_eq!(laid_out.nodes[1].parent_id.as_deref(), Some("G"));
        assert!(laid_out.nodes[0].style.width_px().is_some());
        assert_eq!(laid_out.edges.len(), 1);
    }

    #[test]
    fn applies_shorthand_options() {
        let options: FlowLayoutOptions =
            serde_json::from_str(r#"{"direction": "LR", "gridSize": 10}"#).unwrap();
        let config = build_config(options).unwrap();
        assert_eq!(config.layout.grid_size, 10.0);

        let bad: FlowLayoutOptions = serde_json::from_str(r#"{"gridSize": 0}"#).unwrap();
        assert!(build_config(bad).is_err());
    }
}
