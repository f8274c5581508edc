mod app;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use explore_graph::EngineConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph snapshot as JSON. A built-in demo graph is shown when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Engine configuration as JSON; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulation ticks run before showing a changed graph.
    #[arg(long)]
    settle_iterations: Option<usize>,
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            EngineConfig::from_json(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(iterations) = args.settle_iterations {
        config.settle_iterations = iterations;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::info!(input = ?args.input, settle_iterations = config.settle_iterations, "starting");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };

    eframe::run_native(
        "explore-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::ExplorerApp::new(cc, config, args.input.clone())))),
    )
    .map_err(|error| anyhow::anyhow!("viewer exited with an error: {error}"))
}
