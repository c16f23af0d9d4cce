use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use crossbeam_channel::select;
use pollwatch::Watcher;
use pollwatch::cli::Cli;
use pollwatch::config::{Config, parser::validate_config, validator::ConfigValidator};
use pollwatch::output::{self, Verbosity};
use pollwatch::runner::CommandRunner;
use std::io;
use std::process;
use std::sync::Arc;
use std::thread;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "pollwatch", &mut io::stdout());
        return Ok(());
    }

    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    output::set_verbosity(verbosity);
    init_tracing(verbosity);

    let config = load_config(&cli)?;
    let interval = config.interval()?;
    let runner = CommandRunner::from_config(&config.command)?;

    let watcher = Arc::new(Watcher::new());
    config.apply(&watcher)?;
    for path in cli.watch_paths() {
        watcher
            .add_path(&path, config.watch.recursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        output::verbose(&format!("Added {}", path.display()));
    }

    let watched = watcher.list_watched();
    if cli.list {
        output::watch_list(&watched);
    }
    output::info(&format!("Watching {} files", watched.len()));

    if config.command.startcmd
        && let Some(runner) = &runner
    {
        runner.on_start().context("Start command failed")?;
    }

    let handler = Arc::clone(&watcher);
    ctrlc::set_handler(move || handler.close()).context("Failed to install Ctrl-C handler")?;

    let consumer = {
        let watcher = Arc::clone(&watcher);
        thread::spawn(move || consume(&watcher, runner.as_ref()))
    };

    watcher.start(interval)?;
    consumer
        .join()
        .map_err(|_| anyhow!("Event consumer panicked"))??;

    output::info("pollwatch closed");
    Ok(())
}

/// Print events, run the command on each, and surface poll errors until
/// the watcher shuts down.
fn consume(watcher: &Watcher, runner: Option<&CommandRunner>) -> Result<()> {
    let events = watcher.events();
    let errors = watcher.errors();
    let closed = watcher.closed();

    loop {
        select! {
            recv(events) -> msg => {
                let Ok(event) = msg else { break };
                output::event(&event);
                if let Some(runner) = runner
                    && let Err(e) = runner.on_event(&event)
                {
                    watcher.close();
                    return Err(e);
                }
            }
            recv(errors) -> msg => {
                if let Ok(e) = msg {
                    output::warning(&format!("Warning: {e}"));
                }
            }
            recv(closed) -> _ => break,
        }
    }

    debug!("Event consumer finished");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) if !path.exists() => {
            bail!("Config file not found: {}", path.display());
        }
        Some(path) => Some(path.clone()),
        None => Config::default_path(),
    };

    let mut config = match &path {
        Some(path) => {
            if let Err(e) = ConfigValidator::new().validate_config_file(path) {
                output::warning(&format!("Warning: Configuration validation failed: {e}"));
            }
            Config::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => Config::default(),
    };

    config.merge_cli(cli);
    validate_config(&config)?;
    Ok(config)
}

fn init_tracing(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive())),
        )
        .with_writer(io::stderr)
        .init();
}
