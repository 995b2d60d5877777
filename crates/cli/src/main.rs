use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use nlmflow_core::coordinator::TopicReport;
use nlmflow_core::{
    load_config, validate_config, CliClient, Coordinator, RunSummary, StateStore, StatusBoard,
};

/// Drives every configured topic through the notebook pipeline.
#[derive(Debug, Parser)]
#[command(name = "nlmflow", version)]
struct Cli {
    /// Pipeline configuration (JSON, or TOML by extension).
    #[arg(long, env = "NLMFLOW_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// State file; overrides `state_path` from the configuration.
    #[arg(long, env = "NLMFLOW_STATE")]
    state: Option<PathBuf>,

    /// Skip the interactive login before the run.
    #[arg(long)]
    skip_login: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.log_file.as_deref(), cli.json_logs)?;

    info!("Loading configuration from {:?}", cli.config);
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    if let Some(state_path) = cli.state {
        config.state_path = state_path;
    }
    info!(
        "Configuration loaded: {} topic(s), state at {:?}",
        config.topics.len(),
        config.state_path
    );

    let client = Arc::new(CliClient::new(config.client.clone()));
    if cli.skip_login {
        info!("Skipping login");
    } else {
        login(&client).await?;
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;

    let state = Arc::new(StateStore::open(config.state_path.clone()));
    let board = Arc::new(StatusBoard::for_config(&config));
    let coordinator = Coordinator::new(Arc::new(config), client, state, board)
        .with_refresh_callback(Arc::new(draw));

    tokio::select! {
        summary = coordinator.run() => print_summary(&summary),
        _ = signal::ctrl_c() => {
            warn!("Interrupted, no longer waiting for running topics");
            println!("\nInterrupted.");
        }
    }

    Ok(())
}

fn init_logging(log_file: Option<&Path>, json: bool) -> Result<()> {
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            if json {
                layer.json().boxed()
            } else {
                layer.boxed()
            }
        }
        None => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            if json {
                layer.json().boxed()
            } else {
                layer.boxed()
            }
        }
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    Ok(())
}

/// Runs the client's login flow attached to the terminal.
async fn login(client: &CliClient) -> Result<()> {
    let args = &client.config().login_args;
    println!("Ensuring authentication via `{}`...", client.command_line(args));
    let status = client
        .run_interactive(args)
        .await
        .context("Failed to launch login")?;
    if !status.success() {
        bail!("Authentication failed ({}), pipeline aborted", status);
    }
    println!("Authentication complete.\n");
    Ok(())
}

fn draw(board: &StatusBoard) {
    // Clear the screen and home the cursor
    print!("\x1B[2J\x1B[H{}", board.render());
}

fn print_summary(summary: &RunSummary) {
    println!();
    for topic in &summary.topics {
        let result = match &topic.report {
            TopicReport::Finished => "finished".to_string(),
            TopicReport::Aborted(reason) => format!("aborted: {}", reason.message()),
            TopicReport::Crashed(message) => format!("crashed: {}", message),
        };
        println!("  {:<24} {}", topic.key, result);
    }
    println!(
        "\nPipeline finished: {} finished, {} aborted, {} crashed.",
        summary.finished_count(),
        summary.aborted_count(),
        summary.crashed_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["nlmflow"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert!(cli.state.is_none());
        assert!(!cli.skip_login);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "nlmflow",
            "--config",
            "topics.toml",
            "--state",
            "/tmp/state.json",
            "--skip-login",
            "--log-file",
            "run.log",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("topics.toml"));
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/state.json")));
        assert!(cli.skip_login);
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["nlmflow", "--verbose"]).is_err());
    }
}
