use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol used when neither the caller nor the config picks one.
pub const DEFAULT_PROTOCOL: &str = "HTTPS";

/// Protocol labels offered by editors. Edges accept any label.
pub const PROTOCOLS: [&str; 4] = ["HTTPS", "HTTP", "RDP", "VNC"];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Point) -> Self {
        Self {
            x: self.x + by.x,
            y: self.y + by.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    User,
    Gateway,
    Broker,
    Resource,
    Group,
    Hub,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::User,
        NodeKind::Gateway,
        NodeKind::Broker,
        NodeKind::Resource,
        NodeKind::Group,
        NodeKind::Hub,
    ];

    /// Parses the node `type` tag used by diagram documents (`userNode`, `hubNode`, ...).
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "userNode" => Some(Self::User),
            "gatewayNode" => Some(Self::Gateway),
            "brokerNode" => Some(Self::Broker),
            "resourceNode" => Some(Self::Resource),
            "groupNode" => Some(Self::Group),
            "hubNode" => Some(Self::Hub),
            _ => None,
        }
    }

    pub fn type_tag(self) -> &'static str {
        match self {
            Self::User => "userNode",
            Self::Gateway => "gatewayNode",
            Self::Broker => "brokerNode",
            Self::Resource => "resourceNode",
            Self::Group => "groupNode",
            Self::Hub => "hubNode",
        }
    }

    /// Short name used for generated ids (`gateway-3`).
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Gateway => "gateway",
            Self::Broker => "broker",
            Self::Resource => "resource",
            Self::Group => "group",
            Self::Hub => "hub",
        }
    }
}

// ── Anchors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }

    /// Accepts both the long form (`left`) and the single-letter form (`l`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Some(Self::Left),
            "r" | "right" => Some(Self::Right),
            "t" | "top" => Some(Self::Top),
            "b" | "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {role} handle `{raw}`")]
pub struct HandleParseError {
    role: &'static str,
    raw: String,
}

fn parse_handle(raw: &str, role: &'static str) -> Result<Side, HandleParseError> {
    let invalid = || HandleParseError {
        role,
        raw: raw.to_string(),
    };
    let (side, suffix) = raw.trim().rsplit_once('-').ok_or_else(invalid)?;
    if suffix != role {
        return Err(invalid());
    }
    Side::from_token(side).ok_or_else(invalid)
}

/// Anchor on the geometric source of an edge. Always renders as `<side>-source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SourceHandle(pub Side);

/// Anchor on the geometric target of an edge. Always renders as `<side>-target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TargetHandle(pub Side);

impl SourceHandle {
    pub fn parse(raw: &str) -> Result<Self, HandleParseError> {
        parse_handle(raw, "source").map(Self)
    }

    pub fn side(self) -> Side {
        self.0
    }
}

impl TargetHandle {
    pub fn parse(raw: &str) -> Result<Self, HandleParseError> {
        parse_handle(raw, "target").map(Self)
    }

    pub fn side(self) -> Side {
        self.0
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-source", self.0.as_str())
    }
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-target", self.0.as_str())
    }
}

impl From<SourceHandle> for String {
    fn from(handle: SourceHandle) -> Self {
        handle.to_string()
    }
}

impl From<TargetHandle> for String {
    fn from(handle: TargetHandle) -> Self {
        handle.to_string()
    }
}

impl TryFrom<String> for SourceHandle {
    type Error = HandleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for TargetHandle {
    type Error = HandleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

// ── Flow direction ──────────────────────────────────────────────────

/// Flow semantics of a link, independent of which endpoint is the geometric source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalDirection {
    #[default]
    Outbound,
    Inbound,
    Bidirectional,
    Sync,
}

impl LogicalDirection {
    pub const ALL: [LogicalDirection; 4] = [
        LogicalDirection::Outbound,
        LogicalDirection::Inbound,
        LogicalDirection::Bidirectional,
        LogicalDirection::Sync,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "outbound" => Some(Self::Outbound),
            "inbound" => Some(Self::Inbound),
            "bidirectional" => Some(Self::Bidirectional),
            "sync" => Some(Self::Sync),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "outbound",
            Self::Inbound => "inbound",
            Self::Bidirectional => "bidirectional",
            Self::Sync => "sync",
        }
    }

    /// Whether the flow carries an arrowhead at the geometric target.
    pub fn points_at_target(self) -> bool {
        matches!(self, Self::Outbound | Self::Bidirectional | Self::Sync)
    }

    /// Whether the flow carries an arrowhead at the geometric source.
    pub fn points_at_source(self) -> bool {
        matches!(self, Self::Inbound | Self::Bidirectional | Self::Sync)
    }

    pub fn is_sync(self) -> bool {
        self == Self::Sync
    }
}

// ── Node payloads ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "VDI 1:1")]
    DedicatedVdi,
    #[serde(rename = "Session-Based VDI")]
    SessionVdi,
    #[serde(rename = "Virtual Application Server")]
    AppServer,
}

impl ResourceType {
    pub fn label(self) -> &'static str {
        match self {
            Self::DedicatedVdi => "VDI 1:1",
            Self::SessionVdi => "Session-Based VDI",
            Self::AppServer => "Virtual Application Server",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "VDI 1:1" => Some(Self::DedicatedVdi),
            "Session-Based VDI" => Some(Self::SessionVdi),
            "Virtual Application Server" => Some(Self::AppServer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionType {
    #[serde(rename = "VM")]
    Vm,
    Container,
}

impl ExecutionType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Vm => "VM",
            Self::Container => "Container",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "VM" => Some(Self::Vm),
            "Container" => Some(Self::Container),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsType {
    #[serde(rename = "Windows Server")]
    WindowsServer,
    #[serde(rename = "Windows 10")]
    Windows10,
    #[serde(rename = "Windows 11")]
    Windows11,
    Linux,
}

impl OsType {
    pub fn label(self) -> &'static str {
        match self {
            Self::WindowsServer => "Windows Server",
            Self::Windows10 => "Windows 10",
            Self::Windows11 => "Windows 11",
            Self::Linux => "Linux",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Windows Server" => Some(Self::WindowsServer),
            "Windows 10" => Some(Self::Windows10),
            "Windows 11" => Some(Self::Windows11),
            "Linux" => Some(Self::Linux),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpecs {
    pub cpu: u32,
    pub ram: u32,
    pub disk_c: u32,
    pub disk_d: u32,
}

/// Sizing and platform of a machine-backed component.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostProfile {
    pub os_type: Option<OsType>,
    pub execution_type: Option<ExecutionType>,
    pub specs: Option<ResourceSpecs>,
}

/// What a group node frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneKind {
    UserGroup,
    Datacenter,
    CloudZone,
    #[serde(rename = "vmware")]
    VmWare,
    VdiPool,
    #[default]
    Other,
}

impl ZoneKind {
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "userGroup" => Self::UserGroup,
            "datacenter" => Self::Datacenter,
            "cloudZone" => Self::CloudZone,
            "vmware" => Self::VmWare,
            "vdiPool" => Self::VdiPool,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserGroup => "userGroup",
            Self::Datacenter => "datacenter",
            Self::CloudZone => "cloudZone",
            Self::VmWare => "vmware",
            Self::VdiPool => "vdiPool",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeData {
    #[serde(rename_all = "camelCase")]
    User {
        label: String,
        sub_type: Option<String>,
    },
    Gateway {
        label: String,
        host: HostProfile,
    },
    Broker {
        label: String,
        host: HostProfile,
    },
    #[serde(rename_all = "camelCase")]
    Resource {
        label: String,
        sub_type: Option<String>,
        resource_type: Option<ResourceType>,
        host: HostProfile,
    },
    Group {
        label: String,
        zone: ZoneKind,
    },
    Hub {
        label: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKey {
    SubType,
    OsType,
    ExecutionType,
    Cpu,
    Ram,
}

/// A metadata badge derived from a node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: TagKey,
    pub label: &'static str,
    pub value: String,
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::User { .. } => NodeKind::User,
            Self::Gateway { .. } => NodeKind::Gateway,
            Self::Broker { .. } => NodeKind::Broker,
            Self::Resource { .. } => NodeKind::Resource,
            Self::Group { .. } => NodeKind::Group,
            Self::Hub { .. } => NodeKind::Hub,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::User { label, .. }
            | Self::Gateway { label, .. }
            | Self::Broker { label, .. }
            | Self::Resource { label, .. }
            | Self::Group { label, .. }
            | Self::Hub { label } => label,
        }
    }

    pub fn sub_type(&self) -> Option<&str> {
        match self {
            Self::User { sub_type, .. } | Self::Resource { sub_type, .. } => sub_type.as_deref(),
            _ => None,
        }
    }

    pub fn host(&self) -> Option<&HostProfile> {
        match self {
            Self::Gateway { host, .. } | Self::Broker { host, .. } | Self::Resource { host, .. } => {
                Some(host)
            }
            _ => None,
        }
    }

    fn host_mut(&mut self) -> Option<&mut HostProfile> {
        match self {
            Self::Gateway { host, .. } | Self::Broker { host, .. } | Self::Resource { host, .. } => {
                Some(host)
            }
            _ => None,
        }
    }

    /// Badges in display order: sub-type, OS, execution mode, CPU, RAM.
    /// Zero CPU/RAM counts are not shown.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = Vec::new();
        if let Some(sub) = self.sub_type() {
            tags.push(Tag {
                key: TagKey::SubType,
                label: "SubType",
                value: sub.to_string(),
            });
        }
        let Some(host) = self.host() else {
            return tags;
        };
        if let Some(os) = host.os_type {
            tags.push(Tag {
                key: TagKey::OsType,
                label: "OS",
                value: os.label().to_string(),
            });
        }
        if let Some(exec) = host.execution_type {
            tags.push(Tag {
                key: TagKey::ExecutionType,
                label: "Mode",
                value: exec.label().to_string(),
            });
        }
        if let Some(specs) = host.specs {
            if specs.cpu > 0 {
                tags.push(Tag {
                    key: TagKey::Cpu,
                    label: "CPU",
                    value: format!("{} Cores", specs.cpu),
                });
            }
            if specs.ram > 0 {
                tags.push(Tag {
                    key: TagKey::Ram,
                    label: "RAM",
                    value: format!("{} GB", specs.ram),
                });
            }
        }
        tags
    }

    /// Removes one badge. CPU and RAM are zeroed rather than dropped.
    /// Returns whether anything changed.
    pub fn clear_tag(&mut self, key: TagKey) -> bool {
        match key {
            TagKey::SubType => match self {
                Self::User { sub_type, .. } | Self::Resource { sub_type, .. } => {
                    sub_type.take().is_some()
                }
                _ => false,
            },
            TagKey::OsType => self
                .host_mut()
                .is_some_and(|host| host.os_type.take().is_some()),
            TagKey::ExecutionType => self
                .host_mut()
                .is_some_and(|host| host.execution_type.take().is_some()),
            TagKey::Cpu | TagKey::Ram => {
                let Some(specs) = self.host_mut().and_then(|host| host.specs.as_mut()) else {
                    return false;
                };
                let slot = if key == TagKey::Cpu {
                    &mut specs.cpu
                } else {
                    &mut specs.ram
                };
                let changed = *slot != 0;
                *slot = 0;
                changed
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Top-left corner. Relative to the parent group when `parent_id` is set.
    pub position: Point,
    pub size: Option<Size>,
    pub parent_id: Option<String>,
    /// Dragging is clamped to the parent's frame.
    pub confined: bool,
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, data: NodeData, position: Point) -> Self {
        Self {
            id: id.into(),
            position,
            size: None,
            parent_id: None,
            confined: false,
            data,
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self.confined = true;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn is_hub(&self) -> bool {
        self.kind() == NodeKind::Hub
    }

    /// Visual center in the node's own coordinate frame.
    pub fn center(&self) -> Point {
        let size = self.size.unwrap_or_default();
        Point::new(
            self.position.x + size.width / 2.0,
            self.position.y + size.height / 2.0,
        )
    }
}

/// A routed link, ready for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDescriptor {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: SourceHandle,
    pub target_handle: TargetHandle,
    pub direction: LogicalDirection,
    pub protocol: String,
    pub show_label: bool,
    pub animated: bool,
    pub marker_at_source: bool,
    pub marker_at_target: bool,
}

impl EdgeDescriptor {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}
