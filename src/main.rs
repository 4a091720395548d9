use anyhow::{Context, Result};
use clap::Parser;
use layerview::headless::{AnimationMode, HeadlessAnimator, HeadlessLoader};
use layerview::{ViewManager, ViewTable, script};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Drive the view engine from a navigation script and print the final state
#[derive(Parser)]
#[command(name = "layerview", version, about)]
struct Cli {
    /// TOML file with the [engine] settings and [[views]] table
    #[arg(short, long)]
    views: PathBuf,

    /// Write log output here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Play enter/exit tracks for this many milliseconds instead of instantly
    #[arg(long)]
    animation_ms: Option<u64>,

    /// Script with one navigation command per line
    script: PathBuf,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let table = ViewTable::load(&cli.views)?;
    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("Failed to read script {}", cli.script.display()))?;
    let commands = script::parse(&source)?;

    let mode = match cli.animation_ms {
        Some(ms) => AnimationMode::Timed(Duration::from_millis(ms)),
        None => AnimationMode::Instant,
    };
    let manager = ViewManager::from_table(table, Arc::new(HeadlessLoader::new()))?
        .animator(Arc::new(HeadlessAnimator::new(mode)))
        .build();

    info!("Running {} command(s) from {}", commands.len(), cli.script.display());
    script::run(&manager, &commands).await;

    println!("{}", serde_json::to_string_pretty(&manager.snapshot())?);
    Ok(())
}
