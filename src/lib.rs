#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagram;
pub mod export;
pub mod generate;
pub mod ir;
pub mod routing;
pub mod sample;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use diagram::{Diagram, DiagramError};
pub use export::RenderDump;
pub use generate::{GenerateError, GenerationRequest, GenerationSession, import_diagram, parse_response};
pub use ir::{EdgeDescriptor, LogicalDirection, Node, NodeData, NodeKind, SourceHandle, TargetHandle};
pub use routing::{EdgeEdit, EdgeRequest, build_edge, is_hub, rebuild_edge, resolve_anchors, validate_nodes};
pub use theme::Theme;
