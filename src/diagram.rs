use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::NodeDefaults;
use crate::ir::{EdgeDescriptor, HostProfile, Node, NodeData, NodeKind, Point, TagKey, ZoneKind};
use crate::routing::{
    EdgeEdit, EdgeRequest, absolute_position, build_edge, rebuild_edge, resolve_anchors_in,
    reroute_edge, validate_nodes,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagramError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("unknown edge `{0}`")]
    UnknownEdge(String),
    #[error("node id `{0}` is already taken")]
    DuplicateNode(String),
    #[error("edge id `{0}` is already taken")]
    DuplicateEdge(String),
    #[error("node `{id}` is a {expected:?} and cannot become a {found:?}")]
    KindMismatch {
        id: String,
        expected: NodeKind,
        found: NodeKind,
    },
}

pub type Result<T> = std::result::Result<T, DiagramError>;

/// The whole editable topology: nodes plus routed edges.
///
/// Every edge stored here references existing nodes; operations that would
/// break that are rejected, and node removal cascades to touching edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeDescriptor>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeDescriptor> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    fn node_index(&self, id: &str) -> Result<usize> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or_else(|| DiagramError::UnknownNode(id.to_string()))
    }

    fn edge_index(&self, id: &str) -> Result<usize> {
        self.edges
            .iter()
            .position(|edge| edge.id == id)
            .ok_or_else(|| DiagramError::UnknownEdge(id.to_string()))
    }

    // ── Nodes ───────────────────────────────────────────────────────

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(DiagramError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        validate_nodes(&mut self.nodes);
        Ok(())
    }

    /// Creates a node of `kind` with editor defaults and returns its id.
    pub fn spawn_node(
        &mut self,
        kind: NodeKind,
        sub_type: Option<String>,
        defaults: &NodeDefaults,
    ) -> String {
        let id = self.fresh_node_id(kind);
        let host = || HostProfile {
            os_type: Some(defaults.os_type),
            execution_type: Some(defaults.execution_type),
            specs: Some(defaults.specs),
        };
        let instance_label = |fallback: &str| {
            format!(
                "{} - New Instance",
                sub_type.clone().unwrap_or_else(|| fallback.to_uppercase())
            )
        };
        let data = match kind {
            NodeKind::User => NodeData::User {
                label: format!("New {}", kind.id_prefix()),
                sub_type: sub_type.clone(),
            },
            NodeKind::Gateway => NodeData::Gateway {
                label: instance_label(kind.id_prefix()),
                host: host(),
            },
            NodeKind::Broker => NodeData::Broker {
                label: instance_label(kind.id_prefix()),
                host: host(),
            },
            NodeKind::Resource => NodeData::Resource {
                label: instance_label(kind.id_prefix()),
                resource_type: Some(defaults.resource_type_for(sub_type.as_deref())),
                sub_type: sub_type.clone(),
                host: host(),
            },
            NodeKind::Group => NodeData::Group {
                label: format!("New {}", kind.id_prefix()),
                zone: ZoneKind::Other,
            },
            NodeKind::Hub => NodeData::Hub {
                label: defaults.hub_label.clone(),
            },
        };
        let position = match kind {
            NodeKind::Gateway | NodeKind::Broker | NodeKind::Resource => defaults.component_drop,
            _ => defaults.drop,
        };
        let mut node = Node::new(id.clone(), data, position);
        if kind == NodeKind::Group {
            node.size = Some(defaults.group_size);
        }
        self.nodes.push(node);
        id
    }

    /// Replaces a node's payload. The node kind cannot change.
    pub fn update_node_data(&mut self, id: &str, data: NodeData) -> Result<()> {
        let idx = self.node_index(id)?;
        let expected = self.nodes[idx].kind();
        if data.kind() != expected {
            return Err(DiagramError::KindMismatch {
                id: id.to_string(),
                expected,
                found: data.kind(),
            });
        }
        self.nodes[idx].data = data;
        validate_nodes(&mut self.nodes);
        Ok(())
    }

    pub fn clear_node_tag(&mut self, id: &str, tag: TagKey) -> Result<bool> {
        let idx = self.node_index(id)?;
        let changed = self.nodes[idx].data.clear_tag(tag);
        validate_nodes(&mut self.nodes);
        Ok(changed)
    }

    /// Moves a node and re-routes every edge touching it or anything it contains.
    pub fn move_node(&mut self, id: &str, position: Point) -> Result<()> {
        let idx = self.node_index(id)?;
        self.nodes[idx].position = position;
        let moved = self.subtree(id);
        for i in 0..self.edges.len() {
            let edge = &self.edges[i];
            if moved.contains(&edge.source) || moved.contains(&edge.target) {
                let rerouted = reroute_edge(&self.nodes, edge);
                self.edges[i] = rerouted;
            }
        }
        Ok(())
    }

    /// Removes a node and every edge touching it. Children of a removed group
    /// keep their on-canvas position and become top-level.
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let idx = self.node_index(id)?;
        let children: Vec<(usize, Point)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent_id.as_deref() == Some(id))
            .map(|(i, node)| (i, absolute_position(&self.nodes, node)))
            .collect();
        for (i, absolute) in children {
            self.nodes[i].position = absolute;
        }
        let removed = self.nodes.remove(idx);
        let before = self.edges.len();
        self.edges.retain(|edge| !edge.touches(id));
        log::debug!(
            "removed node `{}` and {} edge(s)",
            id,
            before - self.edges.len()
        );
        validate_nodes(&mut self.nodes);
        Ok(removed)
    }

    fn subtree(&self, root: &str) -> HashSet<String> {
        let mut members: HashSet<String> = HashSet::new();
        members.insert(root.to_string());
        loop {
            let mut grew = false;
            for node in &self.nodes {
                let inside = node
                    .parent_id
                    .as_deref()
                    .is_some_and(|parent| members.contains(parent));
                if inside && members.insert(node.id.clone()) {
                    grew = true;
                }
            }
            if !grew {
                return members;
            }
        }
    }

    pub fn fresh_node_id(&self, kind: NodeKind) -> String {
        fresh_id(kind.id_prefix(), self.nodes.len(), |id| self.node(id).is_some())
    }

    // ── Edges ───────────────────────────────────────────────────────

    /// Adds a link drawn from `request.source` to `request.target`.
    ///
    /// When `logical_source` names the drawn target the endpoints are swapped
    /// so the arrow follows the declared flow. Anchors are always recomputed
    /// from geometry. Returns the new edge id.
    pub fn connect(&mut self, mut request: EdgeRequest, logical_source: Option<&str>) -> Result<String> {
        self.node_index(&request.source)?;
        self.node_index(&request.target)?;
        if let Some(logical_source) = logical_source {
            request.orient_from(logical_source);
        }
        let id = match request.id.take() {
            Some(id) if self.edge(&id).is_some() => return Err(DiagramError::DuplicateEdge(id)),
            Some(id) => id,
            None => self.fresh_edge_id(),
        };
        request.id = Some(id.clone());
        request.anchors = resolve_anchors_in(&self.nodes, &request.source, &request.target);
        let edge = build_edge(&self.nodes, request);
        self.edges.push(edge);
        Ok(id)
    }

    pub fn edit_edge(&mut self, id: &str, edit: &EdgeEdit) -> Result<&EdgeDescriptor> {
        let idx = self.edge_index(id)?;
        let edge = &self.edges[idx];
        if !edge.touches(&edit.logical_source) {
            return Err(DiagramError::UnknownNode(edit.logical_source.clone()));
        }
        let rebuilt = rebuild_edge(&self.nodes, edge, edit);
        self.edges[idx] = rebuilt;
        Ok(&self.edges[idx])
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<EdgeDescriptor> {
        let idx = self.edge_index(id)?;
        Ok(self.edges.remove(idx))
    }

    /// Recomputes anchors and markers of every edge from current geometry.
    pub fn reroute_all(&mut self) {
        let rerouted: Vec<EdgeDescriptor> = self
            .edges
            .iter()
            .map(|edge| reroute_edge(&self.nodes, edge))
            .collect();
        self.edges = rerouted;
    }

    pub fn fresh_edge_id(&self) -> String {
        fresh_id("e", self.edges.len(), |id| self.edge(id).is_some())
    }
}

fn fresh_id(prefix: &str, start: usize, taken: impl Fn(&str) -> bool) -> String {
    let mut n = start + 1;
    loop {
        let candidate = format!("{prefix}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
