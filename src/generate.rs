//! Import path for diagrams proposed by a generative model.
//!
//! Responses are untrusted: they are parsed leniently, repaired where possible
//! and re-routed from scratch before they replace the current diagram.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::diagram::Diagram;
use crate::ir::{
    ExecutionType, HostProfile, LogicalDirection, Node, NodeData, NodeKind, OsType, Point,
    ResourceSpecs, ResourceType, Size, ZoneKind,
};
use crate::routing::{EdgeRequest, build_edge, resolve_anchors_in, validate_nodes};

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n?(.*?)\r?\n?```$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("a generation request is already in flight")]
    Busy,
    #[error("no generation request is in flight")]
    Idle,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("generator failed: {0}")]
    Transport(String),
    #[error("response is not valid JSON: {0}")]
    Malformed(String),
    #[error("response does not match the diagram schema: {0}")]
    Schema(String),
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireDiagram {
    pub nodes: Vec<WireNode>,
    pub edges: Vec<WireEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub id: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default)]
    pub data: WireNodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<WireStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Component category (`userGroup`, `datacenter`, ...). Only groups use it.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<WireSpecs>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSpecs {
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub ram: f64,
    #[serde(default)]
    pub disk_c: f64,
    #[serde(default)]
    pub disk_d: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WireStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<WireEdgeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_label: Option<bool>,
}

impl WireDiagram {
    /// Snapshot of `diagram` in the document shape a generator understands.
    pub fn from_diagram(diagram: &Diagram) -> Self {
        let nodes = diagram.nodes.iter().map(wire_node).collect();
        let edges = diagram
            .edges
            .iter()
            .map(|edge| WireEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                source_handle: Some(edge.source_handle.to_string()),
                target_handle: Some(edge.target_handle.to_string()),
                data: Some(WireEdgeData {
                    protocol: Some(edge.protocol.clone()),
                    direction: Some(edge.direction.as_str().to_string()),
                    show_label: Some(edge.show_label),
                }),
                animated: Some(edge.animated),
            })
            .collect();
        Self { nodes, edges }
    }
}

fn wire_node(node: &Node) -> WireNode {
    let mut data = WireNodeData {
        label: Some(node.data.label().to_string()),
        sub_type: node.data.sub_type().map(str::to_string),
        ..WireNodeData::default()
    };
    if let Some(host) = node.data.host() {
        data.os_type = host.os_type.map(|os| os.label().to_string());
        data.execution_type = host.execution_type.map(|exec| exec.label().to_string());
        data.specs = host.specs.map(|specs| WireSpecs {
            cpu: f64::from(specs.cpu),
            ram: f64::from(specs.ram),
            disk_c: f64::from(specs.disk_c),
            disk_d: f64::from(specs.disk_d),
        });
    }
    match &node.data {
        NodeData::Resource { resource_type, .. } => {
            data.resource_type = resource_type.map(|rt| rt.label().to_string());
        }
        NodeData::Group { zone, .. } => {
            data.component = Some(zone.as_str().to_string());
        }
        _ => {}
    }
    WireNode {
        id: node.id.clone(),
        type_tag: node.kind().type_tag().to_string(),
        position: Some(node.position),
        data,
        parent_id: node.parent_id.clone(),
        style: node.size.map(|size| WireStyle {
            width: Some(size.width),
            height: Some(size.height),
        }),
        extent: node.confined.then(|| "parent".to_string()),
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Parses a generator response, tolerating a surrounding markdown fence and
/// JSON5 syntax (comments, trailing commas, unquoted keys).
pub fn parse_response(text: &str) -> Result<WireDiagram, GenerateError> {
    let trimmed = text.trim();
    let body = FENCE_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(strict) => {
            log::debug!("strict JSON parse failed ({strict}); retrying as JSON5");
            json5::from_str(body).map_err(|_| GenerateError::Malformed(strict.to_string()))?
        }
    };
    serde_json::from_value(value).map_err(|err| GenerateError::Schema(err.to_string()))
}

// ── Import ──────────────────────────────────────────────────────────

/// What an import had to discard or repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub nodes: usize,
    pub edges: usize,
    pub dropped_nodes: Vec<String>,
    pub dropped_edges: Vec<String>,
    pub repaired_parents: usize,
}

/// Turns an untrusted document into a routed diagram.
///
/// Unknown node types, duplicate ids and edges touching missing nodes are
/// dropped. Orphaned parent references are detached. Supplied handles and
/// animation flags are ignored; every edge is routed from geometry.
pub fn import_diagram(wire: WireDiagram, config: &Config) -> (Diagram, ImportReport) {
    let mut report = ImportReport::default();

    let (groups, others): (Vec<WireNode>, Vec<WireNode>) = wire
        .nodes
        .into_iter()
        .partition(|node| NodeKind::from_type_tag(&node.type_tag) == Some(NodeKind::Group));

    let mut nodes: Vec<Node> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for wire_node in groups.into_iter().chain(others) {
        if seen.contains(&wire_node.id) {
            log::warn!("dropping duplicate node id `{}`", wire_node.id);
            report.dropped_nodes.push(wire_node.id);
            continue;
        }
        match node_from_wire(wire_node, config) {
            Ok(node) => {
                seen.insert(node.id.clone());
                nodes.push(node);
            }
            Err(id) => report.dropped_nodes.push(id),
        }
    }
    report.repaired_parents = validate_nodes(&mut nodes);

    let mut diagram = Diagram {
        nodes,
        edges: Vec::new(),
    };
    for wire_edge in wire.edges {
        if diagram.node(&wire_edge.source).is_none() || diagram.node(&wire_edge.target).is_none() {
            log::warn!(
                "dropping edge `{}`: endpoint `{}` -> `{}` is not in the diagram",
                wire_edge.id,
                wire_edge.source,
                wire_edge.target
            );
            report.dropped_edges.push(wire_edge.id);
            continue;
        }
        let id = if wire_edge.id.trim().is_empty() {
            diagram.fresh_edge_id()
        } else if diagram.edge(&wire_edge.id).is_some() {
            log::warn!("dropping duplicate edge id `{}`", wire_edge.id);
            report.dropped_edges.push(wire_edge.id);
            continue;
        } else {
            wire_edge.id
        };
        let data = wire_edge.data.unwrap_or_default();
        let direction = match data.direction.as_deref() {
            None => config.edges.direction,
            Some(raw) => LogicalDirection::from_token(raw).unwrap_or_else(|| {
                log::warn!("edge `{id}` has unknown direction `{raw}`; using default");
                config.edges.direction
            }),
        };
        let mut request = EdgeRequest::new(wire_edge.source, wire_edge.target)
            .with_id(id)
            .with_direction(direction)
            .with_protocol(data.protocol.unwrap_or_else(|| config.edges.protocol.clone()))
            .with_label(data.show_label.unwrap_or(config.edges.show_label));
        request.anchors = resolve_anchors_in(&diagram.nodes, &request.source, &request.target);
        let edge = build_edge(&diagram.nodes, request);
        diagram.edges.push(edge);
    }

    report.nodes = diagram.nodes.len();
    report.edges = diagram.edges.len();
    (diagram, report)
}

fn node_from_wire(wire: WireNode, config: &Config) -> Result<Node, String> {
    let Some(kind) = NodeKind::from_type_tag(&wire.type_tag) else {
        log::warn!(
            "dropping node `{}` with unknown type `{}`",
            wire.id,
            wire.type_tag
        );
        return Err(wire.id);
    };
    let data = node_data(kind, &wire.id, wire.data, config);
    let size = match (kind, wire.style) {
        (NodeKind::Hub, _) | (_, None) => None,
        (_, Some(style)) if style.width.is_none() && style.height.is_none() => None,
        (_, Some(style)) => Some(Size::new(
            style.width.unwrap_or(0.0),
            style.height.unwrap_or(0.0),
        )),
    };
    let parent_id = wire.parent_id.filter(|parent| !parent.trim().is_empty());
    let confined = parent_id.is_some() && wire.extent.as_deref() == Some("parent");
    Ok(Node {
        id: wire.id,
        position: wire.position.unwrap_or_default(),
        size,
        parent_id,
        confined,
        data,
    })
}

fn node_data(kind: NodeKind, id: &str, wire: WireNodeData, config: &Config) -> NodeData {
    let label = wire.label.unwrap_or_else(|| match kind {
        NodeKind::Hub => config.nodes.hub_label.clone(),
        _ => id.to_string(),
    });
    let host = HostProfile {
        os_type: wire.os_type.as_deref().and_then(OsType::from_label),
        execution_type: wire
            .execution_type
            .as_deref()
            .and_then(ExecutionType::from_label),
        specs: wire.specs.map(|specs| ResourceSpecs {
            cpu: spec_count(specs.cpu),
            ram: spec_count(specs.ram),
            disk_c: spec_count(specs.disk_c),
            disk_d: spec_count(specs.disk_d),
        }),
    };
    match kind {
        NodeKind::User => NodeData::User {
            label,
            sub_type: wire.sub_type,
        },
        NodeKind::Gateway => NodeData::Gateway { label, host },
        NodeKind::Broker => NodeData::Broker { label, host },
        NodeKind::Resource => NodeData::Resource {
            label,
            sub_type: wire.sub_type,
            resource_type: wire
                .resource_type
                .as_deref()
                .and_then(ResourceType::from_label),
            host,
        },
        NodeKind::Group => NodeData::Group {
            label,
            zone: wire
                .component
                .as_deref()
                .map(ZoneKind::from_token)
                .unwrap_or_default(),
        },
        NodeKind::Hub => NodeData::Hub { label },
    }
}

fn spec_count(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0.0 {
        raw.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

// ── Generation session ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    /// Build a new topology from a description.
    Prompt(String),
    /// Re-lay-out the given topology.
    Optimize(WireDiagram),
}

/// Transport to a generative model. Returns the raw response text.
pub trait ArchitectureGenerator {
    fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;
}

impl<F> ArchitectureGenerator for F
where
    F: Fn(&GenerationRequest) -> anyhow::Result<String>,
{
    fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        self(request)
    }
}

/// Owns the diagram while generation requests come and go.
///
/// At most one request is outstanding. A successful response replaces the
/// diagram wholesale; any failure leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct GenerationSession {
    diagram: Diagram,
    config: Config,
    loading: bool,
}

impl GenerationSession {
    pub fn new(diagram: Diagram, config: Config) -> Self {
        Self {
            diagram,
            config,
            loading: false,
        }
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn diagram_mut(&mut self) -> &mut Diagram {
        &mut self.diagram
    }

    pub fn into_diagram(self) -> Diagram {
        self.diagram
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn optimize_request(&self) -> GenerationRequest {
        GenerationRequest::Optimize(WireDiagram::from_diagram(&self.diagram))
    }

    pub fn begin(&mut self, request: &GenerationRequest) -> Result<(), GenerateError> {
        if self.loading {
            return Err(GenerateError::Busy);
        }
        if let GenerationRequest::Prompt(prompt) = request {
            if prompt.trim().is_empty() {
                return Err(GenerateError::EmptyPrompt);
            }
        }
        self.loading = true;
        Ok(())
    }

    /// Applies the outcome of the outstanding request and clears the loading flag.
    pub fn complete(
        &mut self,
        response: anyhow::Result<String>,
    ) -> Result<ImportReport, GenerateError> {
        if !self.loading {
            return Err(GenerateError::Idle);
        }
        self.loading = false;
        let outcome = response
            .map_err(|err| GenerateError::Transport(format!("{err:#}")))
            .and_then(|text| parse_response(&text));
        match outcome {
            Ok(wire) => {
                let (diagram, report) = import_diagram(wire, &self.config);
                log::info!(
                    "applied generated diagram: {} node(s), {} edge(s), {} dropped",
                    report.nodes,
                    report.edges,
                    report.dropped_nodes.len() + report.dropped_edges.len()
                );
                self.diagram = diagram;
                Ok(report)
            }
            Err(err) => {
                log::error!("generation failed, keeping current diagram: {err}");
                Err(err)
            }
        }
    }

    pub fn run(
        &mut self,
        generator: &impl ArchitectureGenerator,
        request: GenerationRequest,
    ) -> Result<ImportReport, GenerateError> {
        self.begin(&request)?;
        let response = generator.generate(&request);
        self.complete(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Side, SourceHandle, TargetHandle};

    const SMALL: &str = r#"{
        "nodes": [
            { "id": "gw", "type": "gatewayNode", "position": { "x": 0, "y": 0 },
              "data": { "label": "Gateway", "osType": "Linux", "specs": { "cpu": 4, "ram": 16 } },
              "style": { "width": 100, "height": 40 } },
            { "id": "hub", "type": "hubNode", "position": { "x": 400, "y": 0 },
              "data": { "label": "Bus" }, "style": { "width": 50, "height": 50 } }
        ],
        "edges": [
            { "id": "e1", "source": "gw", "target": "hub",
              "sourceHandle": "t-source", "targetHandle": "l-target",
              "data": { "protocol": "RDP", "direction": "outbound" } }
        ]
    }"#;

    #[test]
    fn strips_markdown_fence() {
        let fenced = format!("```json\n{SMALL}\n```");
        let parsed = parse_response(&fenced).unwrap();
        assert_eq!(parsed.nodes.len(), 2);
        let bare = format!("```\n{SMALL}\n```");
        assert_eq!(parse_response(&bare).unwrap(), parsed);
    }

    #[test]
    fn falls_back_to_json5() {
        let lenient = "{ nodes: [ { id: 'a', type: 'hubNode', data: { label: 'A' }, }, ], edges: [], }";
        let parsed = parse_response(lenient).unwrap();
        assert_eq!(parsed.nodes[0].id, "a");
    }

    #[test]
    fn classifies_failures() {
        assert!(matches!(
            parse_response("certainly! here is your diagram"),
            Err(GenerateError::Malformed(_))
        ));
        assert!(matches!(
            parse_response(r#"{ "nodes": [] }"#),
            Err(GenerateError::Schema(_))
        ));
    }

    #[test]
    fn import_recomputes_handles_and_markers() {
        let (diagram, report) = import_diagram(parse_response(SMALL).unwrap(), &Config::default());
        assert_eq!(report.edges, 1);
        let edge = &diagram.edges[0];
        assert_eq!(edge.source_handle, SourceHandle(Side::Right));
        assert_eq!(edge.target_handle, TargetHandle(Side::Right));
        assert!(!edge.marker_at_target);
        assert!(!edge.marker_at_source);
        assert_eq!(edge.protocol, "RDP");
        assert!(edge.show_label);
        let hub = diagram.node("hub").unwrap();
        assert_eq!(hub.size, None);
        let gw = diagram.node("gw").unwrap();
        let specs = gw.data.host().and_then(|h| h.specs).unwrap();
        assert_eq!((specs.cpu, specs.ram, specs.disk_c), (4, 16, 0));
    }

    #[test]
    fn import_orders_groups_first_and_repairs_orphans() {
        let wire = parse_response(
            r#"{
                "nodes": [
                    { "id": "u", "type": "userNode", "position": { "x": 1, "y": 1 },
                      "data": { "label": "Win" }, "parentId": "g", "extent": "parent" },
                    { "id": "o", "type": "userNode", "data": { "label": "Lost" }, "parentId": "nope" },
                    { "id": "g", "type": "groupNode", "position": { "x": 0, "y": 0 },
                      "data": { "label": "Users", "type": "userGroup" } },
                    { "id": "x", "type": "cloudNode", "data": { "label": "?" } },
                    { "id": "u", "type": "userNode", "data": { "label": "dup" } }
                ],
                "edges": [
                    { "id": "e1", "source": "u", "target": "x" },
                    { "id": "e2", "source": "u", "target": "o", "data": { "direction": "weird" } },
                    { "id": "e2", "source": "o", "target": "u" }
                ]
            }"#,
        )
        .unwrap();
        let (diagram, report) = import_diagram(wire, &Config::default());
        assert_eq!(diagram.nodes[0].id, "g");
        assert_eq!(report.dropped_nodes, vec!["x".to_string(), "u".to_string()]);
        assert_eq!(report.repaired_parents, 1);
        assert_eq!(report.dropped_edges, vec!["e1".to_string(), "e2".to_string()]);
        let orphan = diagram.node("o").unwrap();
        assert_eq!(orphan.parent_id, None);
        assert_eq!(orphan.position, Point::default());
        let child = diagram.node("u").unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("g"));
        assert!(child.confined);
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].direction, LogicalDirection::Outbound);
        assert!(matches!(
            diagram.node("g").unwrap().data,
            NodeData::Group {
                zone: ZoneKind::UserGroup,
                ..
            }
        ));
    }

    #[test]
    fn snapshot_round_trips_through_import() {
        let original = Diagram::sample();
        let wire = WireDiagram::from_diagram(&original);
        let json = serde_json::to_string(&wire).unwrap();
        let (imported, report) = import_diagram(parse_response(&json).unwrap(), &Config::default());
        assert!(report.dropped_nodes.is_empty());
        assert!(report.dropped_edges.is_empty());
        let mut expected = original.clone();
        expected.reroute_all();
        assert_eq!(imported.edges, expected.edges);
        assert_eq!(imported.nodes.len(), expected.nodes.len());
    }

    #[test]
    fn session_rejects_reentrant_and_empty_requests() {
        let mut session = GenerationSession::new(Diagram::sample(), Config::default());
        assert_eq!(
            session.begin(&GenerationRequest::Prompt("   ".to_string())),
            Err(GenerateError::EmptyPrompt)
        );
        assert!(!session.is_loading());
        let request = GenerationRequest::Prompt("two gateways".to_string());
        session.begin(&request).unwrap();
        assert_eq!(session.begin(&request), Err(GenerateError::Busy));
        assert!(session.is_loading());
    }

    #[test]
    fn failed_generation_keeps_diagram() {
        let mut session = GenerationSession::new(Diagram::sample(), Config::default());
        let before = session.diagram().clone();
        let broken = |_: &GenerationRequest| -> anyhow::Result<String> {
            Err(anyhow::anyhow!("connection reset"))
        };
        let err = session
            .run(&broken, GenerationRequest::Prompt("anything".to_string()))
            .unwrap_err();
        assert!(matches!(err, GenerateError::Transport(_)));
        assert_eq!(session.diagram(), &before);
        assert!(!session.is_loading());

        let garbage = |_: &GenerationRequest| -> anyhow::Result<String> { Ok("nope".to_string()) };
        let request = session.optimize_request();
        assert!(session.run(&garbage, request).is_err());
        assert_eq!(session.diagram(), &before);
        assert_eq!(session.complete(Ok(SMALL.to_string())), Err(GenerateError::Idle));
    }

    #[test]
    fn successful_generation_replaces_diagram() {
        let mut session = GenerationSession::new(Diagram::sample(), Config::default());
        let generator =
            |_: &GenerationRequest| -> anyhow::Result<String> { Ok(SMALL.to_string()) };
        let report = session
            .run(&generator, GenerationRequest::Prompt("gateway to bus".to_string()))
            .unwrap();
        assert_eq!(report.nodes, 2);
        assert_eq!(session.diagram().nodes.len(), 2);
        assert!(!session.is_loading());
    }
}
