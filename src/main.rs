use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;

use skystep::cli::{Cli, Command};
use skystep::conditions::ConditionLibrary;
use skystep::config::TutorialConfig;
use skystep::runner::TutorialRunner;
use skystep::script::ScriptedFlight;
use skystep::ui::TerminalSink;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "skystep=debug"
    } else {
        "skystep=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => TutorialConfig::from_path(Path::new(path))
            .with_context(|| format!("failed to load {path}"))?,
        None => TutorialConfig::load()?,
    };
    if let Some(ms) = cli.settle_ms {
        config.settle_ms = ms;
    }

    match cli.command {
        Command::Demo => run_demo(&config, cli.verbose).await,
        Command::Tasks => {
            print_tasks(&config);
            Ok(())
        }
        Command::Check { path } => check(&path),
    }
}

async fn run_demo(config: &TutorialConfig, verbose: bool) -> Result<()> {
    let library = ConditionLibrary::default();
    let sequencer = config.build_sequencer(&library)?;
    let mut source = ScriptedFlight::for_config(config)?;
    let mut sink = TerminalSink::new(verbose);

    let mut runner = TutorialRunner::new(sequencer, config.tick());
    let report = runner.run(&mut source, &mut sink).await?;
    sink.print_report(&report);
    Ok(())
}

fn print_tasks(config: &TutorialConfig) {
    let dim = Style::new().dim();
    println!("Tutorial sequence ({} tasks):", config.tasks.len());
    for (index, task) in config.tasks.iter().enumerate() {
        println!(
            "  {:>2}. {}  {}",
            index + 1,
            task.label,
            dim.apply_to(format!("[{}]", task.condition))
        );
    }
}

fn check(path: &str) -> Result<()> {
    let config = TutorialConfig::from_path(Path::new(path))
        .with_context(|| format!("failed to load {path}"))?;
    let library = ConditionLibrary::default();
    config
        .build_sequencer(&library)
        .with_context(|| format!("{path} does not describe a runnable tutorial"))?;
    println!(
        "{} {path}: {} tasks, {} courses",
        Style::new().green().bold().apply_to("✓"),
        config.tasks.len(),
        config.courses.len()
    );
    Ok(())
}
