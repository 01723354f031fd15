use crate::config::load_config;
use crate::diagram::Diagram;
use crate::export::{RenderDump, write_render_dump};
use crate::generate::{import_diagram, parse_response};
use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "vdit",
    version,
    about = "Route a VDI topology document and emit render-ready edges"
)]
pub struct Args {
    /// Diagram document (JSON, JSON5 or a fenced model response) or '-' for stdin
    #[arg(short = 'i', long = "input", conflicts_with = "demo")]
    pub input: Option<PathBuf>,

    /// Use the built-in demo topology instead of reading input
    #[arg(long = "demo")]
    pub demo: bool,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (theme, edge and node defaults)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Edge id to draw with the highlight colors
    #[arg(long = "highlight")]
    pub highlight: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = load_config(args.config.as_deref())?;

    let diagram = if args.demo {
        Diagram::sample()
    } else {
        let input = read_input(args.input.as_deref())?;
        let wire = parse_response(&input)?;
        let (diagram, report) = import_diagram(wire, &config);
        log::info!(
            "imported {} node(s) and {} edge(s); repaired {} parent reference(s)",
            report.nodes,
            report.edges,
            report.repaired_parents
        );
        if !report.dropped_nodes.is_empty() || !report.dropped_edges.is_empty() {
            log::warn!(
                "dropped nodes {:?} and edges {:?}",
                report.dropped_nodes,
                report.dropped_edges
            );
        }
        diagram
    };

    if let Some(id) = args.highlight.as_deref() {
        if diagram.edge(id).is_none() {
            return Err(anyhow::anyhow!("No edge with id `{}` to highlight", id));
        }
    }

    let dump = RenderDump::from_diagram(&diagram, &config.theme, args.highlight.as_deref());
    write_render_dump(args.output.as_deref(), &dump)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn verbosity_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    // A logger may already be installed when embedded; keep it.
    let _ = env_logger::Builder::new()
        .filter_level(verbosity_filter(verbose))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init();
}
