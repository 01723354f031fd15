use std::collections::HashSet;

use crate::ir::{
    DEFAULT_PROTOCOL, EdgeDescriptor, LogicalDirection, Node, NodeKind, Point, Side,
    SourceHandle, TargetHandle,
};

// ── Hub convention ──────────────────────────────────────────────────
/// Hubs read like a bus: flows leave on the left...
pub const HUB_SOURCE_HANDLE: SourceHandle = SourceHandle(Side::Left);
/// ...and enter on the right.
pub const HUB_TARGET_HANDLE: TargetHandle = TargetHandle(Side::Right);

/// Anchors used when an endpoint cannot be located.
pub const FALLBACK_ANCHORS: (SourceHandle, TargetHandle) =
    (SourceHandle(Side::Right), TargetHandle(Side::Left));

// ── Anchor selection ────────────────────────────────────────────────

/// Picks the anchor pair for a link from `source` to `target`.
///
/// Non-hub endpoints face each other along the dominant axis between the two
/// centers; ties go to the vertical axis. Centers are absolute: parent offsets
/// are looked up in `nodes`, so top-level nodes compare their own positions.
/// Hub endpoints are pinned to [`HUB_SOURCE_HANDLE`] / [`HUB_TARGET_HANDLE`].
pub fn resolve_anchors(nodes: &[Node], source: &Node, target: &Node) -> (SourceHandle, TargetHandle) {
    anchors_between(
        source.kind(),
        absolute_center(nodes, source),
        target.kind(),
        absolute_center(nodes, target),
    )
}

/// [`resolve_anchors`] by id. `None` when either endpoint is missing.
pub fn resolve_anchors_in(
    nodes: &[Node],
    source_id: &str,
    target_id: &str,
) -> Option<(SourceHandle, TargetHandle)> {
    let source = find_node(nodes, source_id)?;
    let target = find_node(nodes, target_id)?;
    Some(resolve_anchors(nodes, source, target))
}

fn anchors_between(
    source_kind: NodeKind,
    source_center: Point,
    target_kind: NodeKind,
    target_center: Point,
) -> (SourceHandle, TargetHandle) {
    let dx = target_center.x - source_center.x;
    let dy = target_center.y - source_center.y;
    let horizontal = dx.abs() > dy.abs();

    let source_handle = if source_kind == NodeKind::Hub {
        HUB_SOURCE_HANDLE
    } else if horizontal {
        SourceHandle(if dx > 0.0 { Side::Right } else { Side::Left })
    } else {
        SourceHandle(if dy > 0.0 { Side::Bottom } else { Side::Top })
    };

    let target_handle = if target_kind == NodeKind::Hub {
        HUB_TARGET_HANDLE
    } else if horizontal {
        TargetHandle(if dx > 0.0 { Side::Left } else { Side::Right })
    } else {
        TargetHandle(if dy > 0.0 { Side::Top } else { Side::Bottom })
    };

    (source_handle, target_handle)
}

pub fn find_node<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|node| node.id == id)
}

pub fn is_hub(nodes: &[Node], node_id: &str) -> bool {
    find_node(nodes, node_id).is_some_and(Node::is_hub)
}

/// Top-left corner in diagram space, summing parent offsets.
/// Parent cycles stop after one pass over the collection.
pub fn absolute_position(nodes: &[Node], node: &Node) -> Point {
    let mut position = node.position;
    let mut parent = node.parent_id.as_deref();
    let mut hops = 0;
    while let Some(parent_id) = parent {
        if hops >= nodes.len() {
            break;
        }
        let Some(parent_node) = find_node(nodes, parent_id) else {
            break;
        };
        position = position.offset(parent_node.position);
        parent = parent_node.parent_id.as_deref();
        hops += 1;
    }
    position
}

pub fn absolute_center(nodes: &[Node], node: &Node) -> Point {
    let origin = absolute_position(nodes, node);
    let size = node.size.unwrap_or_default();
    Point::new(origin.x + size.width / 2.0, origin.y + size.height / 2.0)
}

// ── Edge construction ───────────────────────────────────────────────

/// Everything needed to build one edge descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRequest {
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    pub direction: LogicalDirection,
    pub protocol: String,
    pub show_label: bool,
    /// Pre-computed anchors. Hub endpoints override them.
    pub anchors: Option<(SourceHandle, TargetHandle)>,
}

impl EdgeRequest {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            direction: LogicalDirection::default(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            show_label: true,
            anchors: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_direction(mut self, direction: LogicalDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_label(mut self, show_label: bool) -> Self {
        self.show_label = show_label;
        self
    }

    pub fn with_anchors(mut self, anchors: (SourceHandle, TargetHandle)) -> Self {
        self.anchors = Some(anchors);
        self
    }

    /// Makes `logical_source` the geometric source, swapping the endpoints
    /// when it currently is the target. Returns whether a swap happened.
    /// Any previously supplied anchors are dropped on swap.
    pub fn orient_from(&mut self, logical_source: &str) -> bool {
        if logical_source == self.source {
            return false;
        }
        std::mem::swap(&mut self.source, &mut self.target);
        self.anchors = None;
        true
    }
}

/// Builds a descriptor with markers, animation and hub-pinned anchors.
///
/// A hub endpoint never carries an arrowhead. Endpoint ids are not checked;
/// when an endpoint is missing and no anchors were supplied the fallback
/// pair is used.
pub fn build_edge(nodes: &[Node], request: EdgeRequest) -> EdgeDescriptor {
    let source_is_hub = is_hub(nodes, &request.source);
    let target_is_hub = is_hub(nodes, &request.target);
    let direction = request.direction;

    let (mut source_handle, mut target_handle) = request
        .anchors
        .or_else(|| resolve_anchors_in(nodes, &request.source, &request.target))
        .unwrap_or(FALLBACK_ANCHORS);
    if source_is_hub {
        source_handle = HUB_SOURCE_HANDLE;
    }
    if target_is_hub {
        target_handle = HUB_TARGET_HANDLE;
    }

    let id = request
        .id
        .unwrap_or_else(|| format!("e-{}-{}", request.source, request.target));

    EdgeDescriptor {
        id,
        source: request.source,
        target: request.target,
        source_handle,
        target_handle,
        direction,
        protocol: request.protocol,
        show_label: request.show_label,
        animated: direction.is_sync(),
        marker_at_source: !source_is_hub && direction.points_at_source(),
        marker_at_target: !target_is_hub && direction.points_at_target(),
    }
}

/// User-side edits to an existing edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEdit {
    /// Endpoint the flow originates from; may be either end of the edge.
    pub logical_source: String,
    pub direction: LogicalDirection,
    pub protocol: String,
    pub show_label: bool,
}

impl EdgeEdit {
    /// Edit pre-filled from the edge's current state.
    pub fn from_edge(edge: &EdgeDescriptor) -> Self {
        Self {
            logical_source: edge.source.clone(),
            direction: edge.direction,
            protocol: edge.protocol.clone(),
            show_label: edge.show_label,
        }
    }

    pub fn swapped(edge: &EdgeDescriptor) -> Self {
        Self {
            logical_source: edge.target.clone(),
            ..Self::from_edge(edge)
        }
    }
}

/// Rebuilds `edge` under `edit`, swapping endpoints when the logical source
/// is the current target. The id is preserved; anchors, markers and
/// animation are recomputed from the current geometry.
pub fn rebuild_edge(nodes: &[Node], edge: &EdgeDescriptor, edit: &EdgeEdit) -> EdgeDescriptor {
    let mut request = EdgeRequest::new(edge.source.clone(), edge.target.clone())
        .with_id(edge.id.clone())
        .with_direction(edit.direction)
        .with_protocol(edit.protocol.clone())
        .with_label(edit.show_label);
    let swapped = request.orient_from(&edit.logical_source);
    request.anchors = resolve_anchors_in(nodes, &request.source, &request.target).or_else(|| {
        // Endpoint missing: keep the drawn sides, mirrored when the ends swap.
        Some(if swapped {
            (
                SourceHandle(edge.target_handle.side()),
                TargetHandle(edge.source_handle.side()),
            )
        } else {
            (edge.source_handle, edge.target_handle)
        })
    });
    build_edge(nodes, request)
}

/// Re-resolves anchors and markers of `edge` without changing its semantics.
pub fn reroute_edge(nodes: &[Node], edge: &EdgeDescriptor) -> EdgeDescriptor {
    rebuild_edge(nodes, edge, &EdgeEdit::from_edge(edge))
}

// ── Containment repair ──────────────────────────────────────────────

/// Clears `parent_id` and confinement on every node whose parent is not in
/// `nodes`. Returns how many nodes were repaired.
pub fn validate_nodes(nodes: &mut [Node]) -> usize {
    let ids: HashSet<String> = nodes.iter().map(|node| node.id.clone()).collect();
    let mut repaired = 0;
    for node in nodes.iter_mut() {
        let orphaned = node
            .parent_id
            .as_deref()
            .is_some_and(|parent| !ids.contains(parent));
        if orphaned {
            log::warn!(
                "node `{}` references missing parent `{}`; detaching",
                node.id,
                node.parent_id.as_deref().unwrap_or_default()
            );
            node.parent_id = None;
            node.confined = false;
            repaired += 1;
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{HostProfile, NodeData, Size};

    fn gateway(id: &str, x: f32, y: f32) -> Node {
        Node::new(
            id,
            NodeData::Gateway {
                label: id.to_string(),
                host: HostProfile::default(),
            },
            Point::new(x, y),
        )
        .with_size(Size::new(100.0, 40.0))
    }

    fn hub(id: &str, x: f32, y: f32) -> Node {
        Node::new(
            id,
            NodeData::Hub {
                label: "Connector".to_string(),
            },
            Point::new(x, y),
        )
    }

    fn group(id: &str, x: f32, y: f32) -> Node {
        Node::new(
            id,
            NodeData::Group {
                label: id.to_string(),
                zone: crate::ir::ZoneKind::Datacenter,
            },
            Point::new(x, y),
        )
        .with_size(Size::new(300.0, 400.0))
    }

    #[test]
    fn horizontal_pair_faces_each_other() {
        let a = gateway("a", 0.0, 0.0);
        let b = gateway("b", 400.0, 0.0);
        assert_eq!(
            resolve_anchors(&[], &a, &b),
            (SourceHandle(Side::Right), TargetHandle(Side::Left))
        );
        assert_eq!(
            resolve_anchors(&[], &b, &a),
            (SourceHandle(Side::Left), TargetHandle(Side::Right))
        );
    }

    #[test]
    fn vertical_pair_faces_each_other() {
        let a = gateway("a", 0.0, 0.0);
        let b = gateway("b", 50.0, 300.0);
        assert_eq!(
            resolve_anchors(&[], &a, &b),
            (SourceHandle(Side::Bottom), TargetHandle(Side::Top))
        );
        assert_eq!(
            resolve_anchors(&[], &b, &a),
            (SourceHandle(Side::Top), TargetHandle(Side::Bottom))
        );
    }

    #[test]
    fn diagonal_tie_prefers_vertical() {
        let a = gateway("a", 0.0, 0.0);
        let b = gateway("b", 100.0, 100.0);
        assert_eq!(
            resolve_anchors(&[], &a, &b),
            (SourceHandle(Side::Bottom), TargetHandle(Side::Top))
        );
    }

    #[test]
    fn coincident_centers_use_top_and_bottom() {
        let a = gateway("a", 10.0, 10.0);
        let b = gateway("b", 10.0, 10.0);
        assert_eq!(
            resolve_anchors(&[], &a, &b),
            (SourceHandle(Side::Top), TargetHandle(Side::Bottom))
        );
    }

    #[test]
    fn hubs_are_pinned() {
        let h = hub("h", 900.0, 900.0);
        let g = gateway("g", 0.0, 0.0);
        assert_eq!(resolve_anchors(&[], &h, &g).0, HUB_SOURCE_HANDLE);
        assert_eq!(resolve_anchors(&[], &g, &h).1, HUB_TARGET_HANDLE);
        assert_eq!(
            resolve_anchors(&[], &h, &h),
            (HUB_SOURCE_HANDLE, HUB_TARGET_HANDLE)
        );
    }

    #[test]
    fn is_hub_is_false_for_unknown_ids() {
        let nodes = vec![hub("h", 0.0, 0.0), gateway("g", 0.0, 0.0)];
        assert!(is_hub(&nodes, "h"));
        assert!(!is_hub(&nodes, "g"));
        assert!(!is_hub(&nodes, "missing"));
    }

    #[test]
    fn hub_source_outbound_marks_target_only() {
        let nodes = vec![hub("h", 500.0, 0.0), gateway("g", 0.0, 0.0)];
        let edge = build_edge(
            &nodes,
            EdgeRequest::new("h", "g").with_direction(LogicalDirection::Outbound),
        );
        assert_eq!(edge.source_handle, SourceHandle(Side::Left));
        assert_eq!(edge.target_handle, TargetHandle(Side::Right));

        // Only the hub end is pinned; the gateway end follows geometry.
        let below = vec![hub("h", 60.0, 500.0), gateway("g", 0.0, 0.0)];
        let edge = build_edge(&below, EdgeRequest::new("h", "g"));
        assert_eq!(edge.source_handle, HUB_SOURCE_HANDLE);
        assert_eq!(edge.target_handle, TargetHandle(Side::Bottom));
        assert!(edge.marker_at_target);
        assert!(!edge.marker_at_source);
        assert!(!edge.animated);
    }

    #[test]
    fn sync_marks_both_ends_and_animates() {
        let nodes = vec![gateway("a", 0.0, 0.0), gateway("b", 400.0, 0.0)];
        let edge = build_edge(
            &nodes,
            EdgeRequest::new("a", "b").with_direction(LogicalDirection::Sync),
        );
        assert!(edge.marker_at_source);
        assert!(edge.marker_at_target);
        assert!(edge.animated);
    }

    #[test]
    fn hub_overrides_supplied_anchors() {
        let nodes = vec![gateway("g", 0.0, 0.0), hub("h", 400.0, 0.0)];
        let edge = build_edge(
            &nodes,
            EdgeRequest::new("g", "h")
                .with_anchors((SourceHandle(Side::Top), TargetHandle(Side::Top))),
        );
        assert_eq!(edge.source_handle, SourceHandle(Side::Top));
        assert_eq!(edge.target_handle, HUB_TARGET_HANDLE);
        assert!(!edge.marker_at_target);
    }

    #[test]
    fn missing_endpoints_fall_back() {
        let edge = build_edge(&[], EdgeRequest::new("x", "y"));
        assert_eq!((edge.source_handle, edge.target_handle), FALLBACK_ANCHORS);
        assert_eq!(edge.id, "e-x-y");
    }

    #[test]
    fn swap_reverses_geometry_and_keeps_id() {
        let nodes = vec![gateway("a", 0.0, 0.0), gateway("b", 400.0, 0.0)];
        let edge = build_edge(&nodes, EdgeRequest::new("a", "b").with_id("e-1"));
        let swapped = rebuild_edge(&nodes, &edge, &EdgeEdit::swapped(&edge));
        assert_eq!(swapped.id, "e-1");
        assert_eq!(swapped.source, "b");
        assert_eq!(swapped.target, "a");
        assert_eq!(swapped.source_handle, SourceHandle(Side::Left));
        assert_eq!(swapped.target_handle, TargetHandle(Side::Right));
        let restored = rebuild_edge(&nodes, &swapped, &EdgeEdit::swapped(&swapped));
        assert_eq!(restored, edge);
    }

    #[test]
    fn edit_without_swap_only_changes_semantics() {
        let nodes = vec![gateway("a", 0.0, 0.0), hub("h", 400.0, 0.0)];
        let edge = build_edge(&nodes, EdgeRequest::new("a", "h").with_id("e-1"));
        let edit = EdgeEdit {
            direction: LogicalDirection::Inbound,
            protocol: "RDP".to_string(),
            ..EdgeEdit::from_edge(&edge)
        };
        let edited = rebuild_edge(&nodes, &edge, &edit);
        assert_eq!(edited.source, "a");
        assert_eq!(edited.protocol, "RDP");
        assert!(edited.marker_at_source);
        assert!(!edited.marker_at_target);
    }

    #[test]
    fn child_nodes_route_on_absolute_centers() {
        // Child sits left of the gateway in its own frame but right of it on the canvas.
        let nodes = vec![
            group("dc", 1000.0, 0.0),
            gateway("child", 20.0, 0.0).with_parent("dc"),
            gateway("gw", 400.0, 0.0),
        ];
        assert_eq!(
            resolve_anchors_in(&nodes, "gw", "child"),
            Some((SourceHandle(Side::Right), TargetHandle(Side::Left)))
        );
        assert_eq!(absolute_position(&nodes, &nodes[1]), Point::new(1020.0, 0.0));
    }

    #[test]
    fn grouped_child_routes_the_same_everywhere() {
        let nodes = vec![
            group("dc", 1000.0, 0.0),
            gateway("child", 20.0, 0.0).with_parent("dc"),
            gateway("gw", 400.0, 0.0),
        ];
        let resolved = resolve_anchors(&nodes, &nodes[2], &nodes[1]);
        assert_eq!(resolved, (SourceHandle(Side::Right), TargetHandle(Side::Left)));

        let edge = build_edge(&nodes, EdgeRequest::new("gw", "child").with_id("e-1"));
        assert_eq!((edge.source_handle, edge.target_handle), resolved);
        let swapped = rebuild_edge(&nodes, &edge, &EdgeEdit::swapped(&edge));
        assert_eq!(
            (swapped.source_handle, swapped.target_handle),
            resolve_anchors(&nodes, &nodes[1], &nodes[2])
        );
    }

    #[test]
    fn swap_with_missing_endpoint_mirrors_sides() {
        let edge = build_edge(&[], EdgeRequest::new("x", "y").with_id("e-1"));
        let swapped = rebuild_edge(&[], &edge, &EdgeEdit::swapped(&edge));
        assert_eq!(swapped.source, "y");
        assert_eq!(swapped.source_handle, SourceHandle(Side::Left));
        assert_eq!(swapped.target_handle, TargetHandle(Side::Right));
        let restored = rebuild_edge(&[], &swapped, &EdgeEdit::swapped(&swapped));
        assert_eq!(restored, edge);
    }

    #[test]
    fn parent_cycles_terminate() {
        let nodes = vec![
            group("a", 10.0, 0.0).with_parent("b"),
            group("b", 10.0, 0.0).with_parent("a"),
        ];
        let pos = absolute_position(&nodes, &nodes[0]);
        assert!(pos.x.is_finite());
    }

    #[test]
    fn validate_detaches_orphans_only() {
        let mut nodes = vec![
            group("dc", 0.0, 0.0),
            gateway("kept", 10.0, 10.0).with_parent("dc"),
            gateway("orphan", 10.0, 10.0).with_parent("ghost"),
            gateway("free", 0.0, 0.0),
        ];
        let before = nodes.clone();
        assert_eq!(validate_nodes(&mut nodes), 1);
        assert_eq!(nodes[2].parent_id, None);
        assert!(!nodes[2].confined);
        assert_eq!(nodes[2].position, before[2].position);
        assert_eq!(nodes[0], before[0]);
        assert_eq!(nodes[1], before[1]);
        assert_eq!(nodes[3], before[3]);
    }
}
