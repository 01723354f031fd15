use crate::ir::{
    DEFAULT_PROTOCOL, ExecutionType, LogicalDirection, OsType, Point, ResourceSpecs, ResourceType,
    Size,
};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Values applied to links whose document or request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDefaults {
    pub protocol: String,
    pub direction: LogicalDirection,
    pub show_label: bool,
}

impl Default for EdgeDefaults {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            direction: LogicalDirection::Outbound,
            show_label: true,
        }
    }
}

/// Values used when an editor creates a node from the palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefaults {
    /// Drop point for users, groups and hubs.
    pub drop: Point,
    /// Drop point for gateways, brokers and resources.
    pub component_drop: Point,
    pub group_size: Size,
    pub hub_label: String,
    pub os_type: OsType,
    pub execution_type: ExecutionType,
    pub specs: ResourceSpecs,
    pub server_sub_type: String,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            drop: Point::new(400.0, 300.0),
            component_drop: Point::new(450.0, 300.0),
            group_size: Size::new(300.0, 400.0),
            hub_label: "Virtual Connector".to_string(),
            os_type: OsType::WindowsServer,
            execution_type: ExecutionType::Vm,
            specs: ResourceSpecs {
                cpu: 2,
                ram: 8,
                disk_c: 40,
                disk_d: 20,
            },
            server_sub_type: "SERVER".to_string(),
        }
    }
}

impl NodeDefaults {
    /// Servers host applications; every other resource defaults to dedicated VDI.
    pub fn resource_type_for(&self, sub_type: Option<&str>) -> ResourceType {
        if sub_type == Some(self.server_sub_type.as_str()) {
            ResourceType::AppServer
        } else {
            ResourceType::DedicatedVdi
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub theme: Theme,
    pub edges: EdgeDefaults,
    pub nodes: NodeDefaults,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    line_color: Option<String>,
    selected_line_color: Option<String>,
    marker_color: Option<String>,
    stroke_width: Option<f32>,
    selected_stroke_width: Option<f32>,
    corner_radius: Option<f32>,
    badge_background: Option<String>,
    badge_text_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeDefaultsFile {
    protocol: Option<String>,
    direction: Option<String>,
    show_label: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeDefaultsFile {
    drop: Option<Point>,
    component_drop: Option<Point>,
    group_size: Option<Size>,
    hub_label: Option<String>,
    os_type: Option<OsType>,
    execution_type: Option<ExecutionType>,
    specs: Option<ResourceSpecs>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    edges: Option<EdgeDefaultsFile>,
    nodes: Option<NodeDefaultsFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlays a JSON config document on top of [`Config::default`].
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::from_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.selected_line_color {
            config.theme.selected_line_color = v;
        }
        if let Some(v) = vars.marker_color {
            config.theme.marker_color = v;
        }
        if let Some(v) = vars.stroke_width {
            config.theme.stroke_width = v;
        }
        if let Some(v) = vars.selected_stroke_width {
            config.theme.selected_stroke_width = v;
        }
        if let Some(v) = vars.corner_radius {
            config.theme.corner_radius = v;
        }
        if let Some(v) = vars.badge_background {
            config.theme.badge_background = v;
        }
        if let Some(v) = vars.badge_text_color {
            config.theme.badge_text_color = v;
        }
    }

    if let Some(edges) = parsed.edges {
        if let Some(v) = edges.protocol {
            config.edges.protocol = v;
        }
        if let Some(raw) = edges.direction {
            config.edges.direction = LogicalDirection::from_token(&raw)
                .ok_or_else(|| anyhow::anyhow!("unknown direction `{raw}`"))?;
        }
        if let Some(v) = edges.show_label {
            config.edges.show_label = v;
        }
    }

    if let Some(nodes) = parsed.nodes {
        if let Some(v) = nodes.drop {
            config.nodes.drop = v;
        }
        if let Some(v) = nodes.component_drop {
            config.nodes.component_drop = v;
        }
        if let Some(v) = nodes.group_size {
            config.nodes.group_size = v;
        }
        if let Some(v) = nodes.hub_label {
            config.nodes.hub_label = v;
        }
        if let Some(v) = nodes.os_type {
            config.nodes.os_type = v;
        }
        if let Some(v) = nodes.execution_type {
            config.nodes.execution_type = v;
        }
        if let Some(v) = nodes.specs {
            config.nodes.specs = v;
        }
    }

    Ok(config)
}
