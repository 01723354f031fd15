use crate::diagram::Diagram;
use crate::ir::EdgeDescriptor;
use crate::routing::absolute_position;
use crate::theme::Theme;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Badge text used when an edge carries no protocol label.
const FALLBACK_PROTOCOL: &str = "TCP";
const MARKER_KIND: &str = "arrowclosed";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub label: String,
    /// Absolute canvas position.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub parent_id: Option<String>,
    pub confined: bool,
    pub tags: Vec<TagDump>,
}

#[derive(Debug, Serialize)]
pub struct TagDump {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub corner_radius: f32,
    pub animated: bool,
    pub marker_start: Option<MarkerDump>,
    pub marker_end: Option<MarkerDump>,
    pub badge: Option<BadgeDump>,
}

#[derive(Debug, Serialize)]
pub struct MarkerDump {
    pub kind: String,
    pub color: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDump {
    pub text: String,
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub color: String,
}

impl RenderDump {
    /// `selected` names an edge drawn with the highlight colors.
    pub fn from_diagram(diagram: &Diagram, theme: &Theme, selected: Option<&str>) -> Self {
        let nodes: Vec<NodeDump> = diagram
            .nodes
            .iter()
            .map(|node| {
                let origin = absolute_position(&diagram.nodes, node);
                let size = node.size.unwrap_or_default();
                NodeDump {
                    id: node.id.clone(),
                    type_tag: node.kind().type_tag().to_string(),
                    label: node.data.label().to_string(),
                    x: origin.x,
                    y: origin.y,
                    width: size.width,
                    height: size.height,
                    parent_id: node.parent_id.clone(),
                    confined: node.confined,
                    tags: node
                        .data
                        .tags()
                        .into_iter()
                        .map(|tag| TagDump {
                            label: tag.label.to_string(),
                            value: tag.value,
                        })
                        .collect(),
                }
            })
            .collect();

        let edges = diagram
            .edges
            .iter()
            .map(|edge| edge_dump(edge, theme, selected == Some(edge.id.as_str())))
            .collect();

        let width = nodes
            .iter()
            .map(|n| n.x + n.width)
            .fold(0.0_f32, f32::max);
        let height = nodes
            .iter()
            .map(|n| n.y + n.height)
            .fold(0.0_f32, f32::max);

        RenderDump {
            width,
            height,
            nodes,
            edges,
        }
    }
}

/// `"<PROTOCOL> | <DIRECTION>"`, upper-cased.
pub fn badge_text(edge: &EdgeDescriptor) -> String {
    let protocol = if edge.protocol.trim().is_empty() {
        FALLBACK_PROTOCOL
    } else {
        edge.protocol.trim()
    };
    format!(
        "{} | {}",
        protocol.to_uppercase(),
        edge.direction.as_str().to_uppercase()
    )
}

fn edge_dump(edge: &EdgeDescriptor, theme: &Theme, selected: bool) -> EdgeDump {
    let marker = |on: bool| {
        on.then(|| MarkerDump {
            kind: MARKER_KIND.to_string(),
            color: theme.marker_color.clone(),
        })
    };
    let (stroke, stroke_width, badge_background) = if selected {
        (
            &theme.selected_line_color,
            theme.selected_stroke_width,
            &theme.selected_badge_background,
        )
    } else {
        (&theme.line_color, theme.stroke_width, &theme.badge_background)
    };
    EdgeDump {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.to_string(),
        target_handle: edge.target_handle.to_string(),
        stroke: stroke.clone(),
        stroke_width,
        corner_radius: theme.corner_radius,
        animated: edge.animated,
        marker_start: marker(edge.marker_at_source),
        marker_end: marker(edge.marker_at_target),
        badge: edge.show_label.then(|| BadgeDump {
            text: badge_text(edge),
            width: theme.badge_width,
            height: theme.badge_height,
            background: badge_background.clone(),
            color: theme.badge_text_color.clone(),
        }),
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `path` is `None`.
pub fn write_render_dump(path: Option<&Path>, dump: &RenderDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_resolves_child_positions() {
        let dump = RenderDump::from_diagram(&Diagram::sample(), &Theme::slate(), None);
        let vdi = dump.nodes.iter().find(|n| n.id == "srv-vdi").unwrap();
        assert_eq!((vdi.x, vdi.y), (1110.0, 180.0));
        assert_eq!(vdi.parent_id.as_deref(), Some("g-oracle"));
        assert_eq!(dump.width, 1600.0);
        assert_eq!(dump.height, 700.0);
    }

    #[test]
    fn dump_carries_markers_and_badges() {
        let theme = Theme::slate();
        let dump = RenderDump::from_diagram(&Diagram::sample(), &theme, Some("e-back4"));
        let sync = dump.edges.iter().find(|e| e.id == "e-back4").unwrap();
        assert_eq!(sync.stroke, theme.selected_line_color);
        assert_eq!(sync.stroke_width, 5.0);
        assert!(sync.marker_start.is_some());
        assert_eq!(sync.marker_end.as_ref().unwrap().color, "#94a3b8");
        assert_eq!(sync.badge.as_ref().unwrap().text, "RDP | SYNC");

        let branch = dump.edges.iter().find(|e| e.id == "e-u1").unwrap();
        assert!(branch.badge.is_none());
        assert!(branch.marker_end.is_none());
        assert_eq!(branch.stroke, theme.line_color);
    }

    #[test]
    fn empty_protocol_falls_back() {
        let mut edge = Diagram::sample().edges.remove(0);
        edge.protocol = "  ".to_string();
        assert_eq!(badge_text(&edge), "TCP | OUTBOUND");
    }
}
