use crate::config::{Config, load_config};
use crate::ir::FlowGraph;
use crate::layout::{check_layout, compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_graph;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "flowlayout",
    version,
    about = "Auto-layout for agent flow graphs (steps, tools, groups)"
)]
pub struct Args {
    /// Input graph document (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout constants and preview theme)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Preview width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Preview height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Check the computed layout and exit non-zero on violations
    #[arg(long = "check")]
    pub check: bool,

    /// Write absolute node rectangles as JSON to this path
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input)?;
    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph parsed"
    );

    let layout = compute_layout(&graph, &config.layout);

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &layout, &graph, &config.layout)?;
    }

    if args.check {
        let issues = check_layout(&graph, &layout, &config.layout);
        if !issues.is_empty() {
            for issue in &issues {
                warn!(%issue, "layout check failed");
                eprintln!("check: {issue}");
            }
            return Err(anyhow::anyhow!(
                "{} layout check(s) failed",
                issues.len()
            ));
        }
    }

    match args.output_format {
        OutputFormat::Json => {
            let laid_out = FlowGraph {
                nodes: layout.nodes,
                edges: graph.edges,
            };
            let json = serde_json::to_string_pretty(&laid_out)?;
            write_text(&json, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            let svg = render_svg(&graph, &layout, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&graph, &layout, &config.theme, &config.render);
            write_png(&svg, &output, &config)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
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

fn write_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{}", text),
    }
    Ok(())
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires the `png` feature"
    ))
}
