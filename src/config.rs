use crate::ir::Direction;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hierarchical pass used for top-level steps and groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutEngine {
    /// `dagre_rust` pass. Opt-in: the published crate can fail to terminate
    /// on some acyclic inputs.
    Dagre,
    /// Built-in longest-path ranking with median ordering.
    #[default]
    Layered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub engine: LayoutEngine,
    pub grid_size: f32,
    pub step_width: f32,
    pub step_height: f32,
    pub tool_width: f32,
    pub tool_height: f32,
    pub default_group_width: f32,
    pub default_group_height: f32,
    pub min_group_width: f32,
    pub min_group_height: f32,
    pub group_padding: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub margin: f32,
    pub tools: ToolPlacementConfig,
    pub order_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopDown,
            engine: LayoutEngine::Layered,
            grid_size: 20.0,
            step_width: 240.0,
            step_height: 100.0,
            tool_width: 180.0,
            tool_height: 60.0,
            default_group_width: 400.0,
            default_group_height: 300.0,
            min_group_width: 300.0,
            min_group_height: 200.0,
            group_padding: 40.0,
            node_spacing: 80.0,
            rank_spacing: 100.0,
            margin: 20.0,
            tools: ToolPlacementConfig::default(),
            order_passes: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPlacementConfig {
    /// Distance between a tool and the step it is attached to.
    pub gap: f32,
    /// Minimum clearance kept between two tools.
    pub separation: f32,
    pub fallback_columns: usize,
    pub fallback_attempts: usize,
    pub repair_attempts: usize,
}

impl Default for ToolPlacementConfig {
    fn default() -> Self {
        Self {
            gap: 60.0,
            separation: 20.0,
            fallback_columns: 3,
            fallback_attempts: 12,
            repair_attempts: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 40.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    step_fill: Option<String>,
    step_border: Option<String>,
    tool_fill: Option<String>,
    tool_border: Option<String>,
    group_fill: Option<String>,
    group_border: Option<String>,
    route_color: Option<String>,
    tool_edge_color: Option<String>,
    text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsConfigFile {
    gap: Option<f32>,
    separation: Option<f32>,
    fallback_columns: Option<usize>,
    fallback_attempts: Option<usize>,
    repair_attempts: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    direction: Option<String>,
    engine: Option<LayoutEngine>,
    grid_size: Option<f32>,
    step_width: Option<f32>,
    step_height: Option<f32>,
    tool_width: Option<f32>,
    tool_height: Option<f32>,
    default_group_width: Option<f32>,
    default_group_height: Option<f32>,
    min_group_width: Option<f32>,
    min_group_height: Option<f32>,
    group_padding: Option<f32>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    margin: Option<f32>,
    order_passes: Option<usize>,
    tools: Option<ToolsConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

/// Applies a JSON options object (same shape as the config file) on top of
/// `config`. Used by the wasm binding.
pub fn merge_config_json(mut config: Config, raw: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(raw)?;
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) -> anyhow::Result<()> {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "classic" {
            config.theme = Theme::classic();
        } else if theme_name == "modern" || theme_name == "default" {
            config.theme = Theme::modern();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.step_fill {
            config.theme.step_fill = v;
        }
        if let Some(v) = vars.step_border {
            config.theme.step_border = v;
        }
        if let Some(v) = vars.tool_fill {
            config.theme.tool_fill = v;
        }
        if let Some(v) = vars.tool_border {
            config.theme.tool_border = v;
        }
        if let Some(v) = vars.group_fill {
            config.theme.group_fill = v;
        }
        if let Some(v) = vars.group_border {
            config.theme.group_border = v;
        }
        if let Some(v) = vars.route_color {
            config.theme.route_color = v;
        }
        if let Some(v) = vars.tool_edge_color {
            config.theme.tool_edge_color = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(token) = layout.direction.as_deref() {
            target.direction = Direction::from_token(token)
                .ok_or_else(|| anyhow::anyhow!("Unknown layout direction: {token}"))?;
        }
        if let Some(v) = layout.engine {
            target.engine = v;
        }
        if let Some(v) = layout.grid_size {
            if v <= 0.0 {
                return Err(anyhow::anyhow!("gridSize must be positive"));
            }
            target.grid_size = v;
        }
        if let Some(v) = layout.step_width {
            target.step_width = v;
        }
        if let Some(v) = layout.step_height {
            target.step_height = v;
        }
        if let Some(v) = layout.tool_width {
            target.tool_width = v;
        }
        if let Some(v) = layout.tool_height {
            target.tool_height = v;
        }
        if let Some(v) = layout.default_group_width {
            target.default_group_width = v;
        }
        if let Some(v) = layout.default_group_height {
            target.default_group_height = v;
        }
        if let Some(v) = layout.min_group_width {
            target.min_group_width = v;
        }
        if let Some(v) = layout.min_group_height {
            target.min_group_height = v;
        }
        if let Some(v) = layout.group_padding {
            target.group_padding = v;
        }
        if let Some(v) = layout.node_spacing {
            target.node_spacing = v;
        }
        if let Some(v) = layout.rank_spacing {
            target.rank_spacing = v;
        }
        if let Some(v) = layout.margin {
            target.margin = v;
        }
        if let Some(v) = layout.order_passes {
            target.order_passes = v;
        }
        if let Some(tools) = layout.tools {
            if let Some(v) = tools.gap {
                target.tools.gap = v;
            }
            if let Some(v) = tools.separation {
                target.tools.separation = v;
            }
            if let Some(v) = tools.fallback_columns {
                target.tools.fallback_columns = v.max(1);
            }
            if let Some(v) = tools.fallback_attempts {
                target.tools.fallback_attempts = v;
            }
            if let Some(v) = tools.repair_attempts {
                target.tools.repair_attempts = v;
            }
        }
    }

    Ok(())
}
