use serde::{Deserialize, Serialize};

/// Colours used by the SVG preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub step_fill: String,
    pub step_border: String,
    pub tool_fill: String,
    pub tool_border: String,
    pub group_fill: String,
    pub group_border: String,
    pub route_color: String,
    pub tool_edge_color: String,
    pub text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            step_fill: "#ECECFF".to_string(),
            step_border: "#9370DB".to_string(),
            tool_fill: "#FFFFDE".to_string(),
            tool_border: "#AAAA33".to_string(),
            group_fill: "#F4F4F4".to_string(),
            group_border: "#999999".to_string(),
            route_color: "#333333".to_string(),
            tool_edge_color: "#AAAA33".to_string(),
            text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            step_fill: "#F8FAFF".to_string(),
            step_border: "#C7D2E5".to_string(),
            tool_fill: "#FFF8EC".to_string(),
            tool_border: "#E5C07B".to_string(),
            group_fill: "#F7FAFF".to_string(),
            group_border: "#D7E0F0".to_string(),
            route_color: "#7A8AA6".to_string(),
            tool_edge_color: "#D19A66".to_string(),
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}
