// Command-line entry point for Calltree.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use calltree::application::ExportUsecase;
use calltree::domain::node::CallNode;
use calltree::domain::settings::Settings;
use calltree::domain::tree::{CallTree, Direction};
use calltree::domain::walker::Walker;
use calltree::infrastructure::concurrency;
use calltree::infrastructure::snapshot::ProgramSnapshot;
use calltree::infrastructure::{DotExporter, JsonExporter, TextExporter};
use calltree::ports::{CallGraphSource, TreeExporter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Program snapshot JSON file
    #[arg(short, long)]
    snapshot: Option<String>,

    /// Settings TOML file (depths, blacklists, limit)
    #[arg(short, long)]
    config: Option<String>,

    /// Root function, by name or 0x-prefixed start address
    #[arg(short, long)]
    function: Option<String>,

    /// Relation to walk (in, out, both)
    #[arg(short, long, default_value = "both")]
    direction: String,

    /// Depth override applied to both directions
    #[arg(long)]
    depth: Option<usize>,

    /// Output file path; prints to stdout when omitted
    #[arg(short, long)]
    output: Option<String>,

    /// Output format (text, dot, json)
    #[arg(long, default_value = "text")]
    format: String,

    /// Run the TCP API server on this port instead of a one-shot walk
    #[arg(long)]
    serve: Option<u16>,
}

fn resolve_function(snapshot: &ProgramSnapshot, spec: &str) -> Result<CallNode> {
    if let Some(hex) = spec.strip_prefix("0x") {
        let address = u64::from_str_radix(hex, 16)
            .with_context(|| format!("Invalid function address: {}", spec))?;
        snapshot
            .function_at(address)
            .with_context(|| format!("No function at {:#x}", address))
    } else {
        snapshot
            .function_named(spec)
            .with_context(|| format!("No function named {}", spec))
    }
}

fn render(tree: &CallTree, format: &str) -> Result<String> {
    match format {
        "text" => Ok(TextExporter::to_text(tree)),
        "dot" => Ok(DotExporter::to_dot(tree)),
        "json" => Ok(serde_json::to_string_pretty(tree)?),
        other => anyhow::bail!("Unknown format: {} (expected text, dot, json)", other),
    }
}

fn exporter_for(format: &str) -> Result<Box<dyn TreeExporter>> {
    match format {
        "text" => Ok(Box::new(TextExporter)),
        "dot" => Ok(Box::new(DotExporter)),
        "json" => Ok(Box::new(JsonExporter)),
        other => anyhow::bail!("Unknown format: {} (expected text, dot, json)", other),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(port) = cli.serve {
        return calltree::api::server::start_server(port);
    }

    concurrency::init_thread_pool()?;

    let snapshot_path = cli
        .snapshot
        .context("--snapshot is required unless --serve is given")?;
    let snapshot = ProgramSnapshot::load(Path::new(&snapshot_path))?;
    println!(
        "[calltree] loaded {} ({} functions, {} symbols)",
        snapshot_path,
        snapshot.function_count(),
        snapshot.symbol_count()
    );

    let mut settings = match &cli.config {
        Some(path) => Settings::load(Path::new(path))?,
        None => Settings::default(),
    };
    if let Some(depth) = cli.depth {
        settings.in_depth = depth;
        settings.out_depth = depth;
    }

    let function_spec = cli
        .function
        .context("--function is required unless --serve is given")?;
    let root = resolve_function(&snapshot, &function_spec)?;

    let directions: Vec<Direction> = match cli.direction.as_str() {
        "both" => vec![Direction::Callers, Direction::Callees],
        other => vec![Direction::parse(other)
            .with_context(|| format!("Unknown direction: {} (expected in, out, both)", other))?],
    };

    let walker = Walker::from_settings(&settings);

    if let Some(output) = &cli.output {
        if directions.len() > 1 {
            anyhow::bail!("--output requires a single direction (in or out)");
        }
        let direction = directions[0];
        let exporter = exporter_for(&cli.format)?;
        let usecase = ExportUsecase {
            source: &snapshot,
            exporter: exporter.as_ref(),
        };
        usecase.run(
            &walker,
            &root,
            direction,
            settings.depth_for(direction),
            output,
        )?;
        println!(
            "[calltree] wrote {} tree for {} to {} (format: {})",
            direction, root.name, output, cli.format
        );
    } else {
        for direction in directions {
            let tree = walker.walk(&snapshot, &root, direction, settings.depth_for(direction));
            print!("{}", render(&tree, &cli.format)?);
            if !matches!(cli.format.as_str(), "text") {
                println!();
            }
        }
    }

    Ok(())
}
