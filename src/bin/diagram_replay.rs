use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Runtime;

use chat_diagrams::cli::Cli;
use chat_diagrams::config::Config;
use chat_diagrams::diagrams::{Engine, MemoryDocument, RenderPipeline, SystemClock, TokioExecutor};
use chat_diagrams::replay;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(server) = &cli.plantuml_server {
        config.plantuml.server = server.clone();
    }
    config.validate().context("invalid configuration")?;

    let level = cli.log_level.unwrap_or(config.log_level);
    chat_diagrams::debug::init_logging(level.to_level_filter(), cli.log_file.as_deref())
        .context("failed to initialise logging")?;
    log::info!("diagram-replay {} starting", chat_diagrams::VERSION);

    let markdown = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let segments = replay::parse_transcript(&markdown);
    let options = cli.replay_options();

    let runtime = Runtime::new().context("failed to start Tokio runtime")?;
    let pipeline = Arc::new(RenderPipeline::from_config(&config));
    let executor = TokioExecutor::new(runtime.handle().clone(), pipeline);
    let mut engine = Engine::new(
        MemoryDocument::new(),
        &config,
        Box::new(executor),
        Arc::new(SystemClock::new()),
    )
    .context("invalid selector in configuration")?;
    engine.start();

    let pause = |engine: &mut Engine<MemoryDocument>, delay: Duration| {
        std::thread::sleep(delay);
        engine.step();
    };
    let blocks = replay::stream_segments(&mut engine, &segments, &options, pause)
        .context("failed to stream transcript")?;
    if !replay::run_until_idle(&mut engine, options.idle_timeout, pause) {
        eprintln!(
            "Timed out after {:?}; writing what has rendered so far",
            options.idle_timeout
        );
    }

    let summary = replay::write_outputs(&engine, &blocks, &cli.output)
        .with_context(|| format!("failed to write to {}", cli.output.display()))?;
    for path in &summary.files {
        println!("{}", path.display());
    }
    println!("{summary}");

    drop(engine);
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
