use crate::diagram::Diagram;
use crate::ir::{
    ExecutionType, HostProfile, LogicalDirection, Node, NodeData, OsType, Point, ResourceSpecs,
    ResourceType, Size, ZoneKind,
};
use crate::routing::{EdgeRequest, build_edge};

const USER_SIZE: Size = Size {
    width: 140.0,
    height: 60.0,
};
const SERVICE_SIZE: Size = Size {
    width: 160.0,
    height: 90.0,
};
const RESOURCE_SIZE: Size = Size {
    width: 180.0,
    height: 100.0,
};

fn host(os: OsType, exec: ExecutionType, cpu: u32, ram: u32, disk_c: u32, disk_d: u32) -> HostProfile {
    HostProfile {
        os_type: Some(os),
        execution_type: Some(exec),
        specs: Some(ResourceSpecs {
            cpu,
            ram,
            disk_c,
            disk_d,
        }),
    }
}

fn user(id: &str, label: &str, y: f32) -> Node {
    Node::new(
        id,
        NodeData::User {
            label: label.to_string(),
            sub_type: Some(label.to_string()),
        },
        Point::new(20.0, y),
    )
    .with_size(USER_SIZE)
    .with_parent("g-user1")
}

fn hub(id: &str, label: &str, x: f32) -> Node {
    Node::new(
        id,
        NodeData::Hub {
            label: label.to_string(),
        },
        Point::new(x, 350.0),
    )
}

impl Diagram {
    /// Demo topology: three user endpoints feed a gateway and broker through
    /// two connectors, ending at resources inside an Oracle Cloud datacenter.
    pub fn sample() -> Self {
        let nodes = vec![
            Node::new(
                "g-user1",
                NodeData::Group {
                    label: "User Group 1".to_string(),
                    zone: ZoneKind::UserGroup,
                },
                Point::new(50.0, 150.0),
            )
            .with_size(Size::new(180.0, 400.0)),
            Node::new(
                "g-oracle",
                NodeData::Group {
                    label: "Oracle Cloud Datacenter".to_string(),
                    zone: ZoneKind::Datacenter,
                },
                Point::new(1050.0, 100.0),
            )
            .with_size(Size::new(550.0, 600.0)),
            hub("hub-in", "Inbound Virtual Connector", 300.0),
            Node::new(
                "gw-dmz",
                NodeData::Gateway {
                    label: "Thinfinity Gateway".to_string(),
                    host: host(OsType::WindowsServer, ExecutionType::Vm, 2, 8, 40, 20),
                },
                Point::new(450.0, 280.0),
            )
            .with_size(SERVICE_SIZE),
            hub("hub-mid", "Mid-Tier Connector", 700.0),
            Node::new(
                "brk-main",
                NodeData::Broker {
                    label: "Primary Broker".to_string(),
                    host: host(OsType::WindowsServer, ExecutionType::Vm, 4, 16, 60, 20),
                },
                Point::new(800.0, 280.0),
            )
            .with_size(SERVICE_SIZE),
            user("u1-win", "Windows", 60.0),
            user("u1-and", "Android", 180.0),
            user("u1-pwa", "PWA", 300.0),
            Node::new(
                "srv-vdi",
                NodeData::Resource {
                    label: "VDI Cluster".to_string(),
                    sub_type: Some("VDI CLUSTER".to_string()),
                    resource_type: Some(ResourceType::SessionVdi),
                    host: host(OsType::Windows10, ExecutionType::Vm, 8, 32, 100, 500),
                },
                Point::new(60.0, 80.0),
            )
            .with_size(RESOURCE_SIZE)
            .with_parent("g-oracle"),
            Node::new(
                "srv-vm",
                NodeData::Resource {
                    label: "App Server".to_string(),
                    sub_type: Some("SERVER".to_string()),
                    resource_type: Some(ResourceType::AppServer),
                    host: host(OsType::Linux, ExecutionType::Container, 4, 16, 60, 20),
                },
                Point::new(60.0, 380.0),
            )
            .with_size(RESOURCE_SIZE)
            .with_parent("g-oracle"),
        ];

        let links = [
            ("e-u1", "u1-win", "hub-in", "HTTPS", LogicalDirection::Outbound, false),
            ("e-u2", "u1-and", "hub-in", "HTTPS", LogicalDirection::Outbound, false),
            ("e-u3", "u1-pwa", "hub-in", "HTTPS", LogicalDirection::Outbound, false),
            ("e-back1", "hub-in", "gw-dmz", "HTTPS", LogicalDirection::Outbound, true),
            ("e-back2", "gw-dmz", "hub-mid", "HTTPS", LogicalDirection::Bidirectional, true),
            ("e-back3", "hub-mid", "brk-main", "HTTPS", LogicalDirection::Bidirectional, false),
            ("e-back4", "brk-main", "srv-vdi", "RDP", LogicalDirection::Sync, true),
        ];
        let edges = links
            .into_iter()
            .map(|(id, source, target, protocol, direction, show_label)| {
                build_edge(
                    &nodes,
                    EdgeRequest::new(source, target)
                        .with_id(id)
                        .with_protocol(protocol)
                        .with_direction(direction)
                        .with_label(show_label),
                )
            })
            .collect();

        Self { nodes, edges }
    }
}
