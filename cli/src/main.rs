use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use seen_cli::commands::{self, Session};
use seen_cli::repl::{self, Prompt};
use seen_core::{ConfyStore, HostSelectors, Placement, Selector, WatcherConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Hide or dim watched videos on saved YouTube pages")]
struct Cli {
    /// Settings profile name
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Mount the toggle as a floating button instead of in the toolbar
    #[arg(long, global = true)]
    floating: bool,

    /// Where to mount the toggle pill, replacing the masthead default
    #[arg(long, global = true, value_name = "SELECTOR")]
    toolbar: Option<Selector>,

    /// Extra card containers to recognise, e.g. "ytd-reel-item-renderer"
    #[arg(long, global = true, value_name = "SELECTOR")]
    cards: Option<Selector>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass over a page and print the decisions
    Scan {
        page: PathBuf,
        #[arg(long)]
        json: bool,
        /// Write the annotated page here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Keep a page reconciled while it changes on disk
    Watch {
        page: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        quiet_ms: Option<u64>,
        #[arg(long)]
        safety_net_ms: Option<u64>,
    },
    /// Show or change persisted settings
    Config {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        grid_columns: Option<i64>,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, String> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Some(path) = log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| format!("Invalid log file: {}", path.display()))?;
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .init();
        return Ok(Some(guard));
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;

    let store = ConfyStore::app(cli.profile);
    let mut selectors = HostSelectors::default();
    if let Some(toolbar) = cli.toolbar {
        selectors = selectors.with_toolbar(toolbar);
    }
    if let Some(cards) = cli.cards {
        selectors = selectors.with_extra_cards(cards);
    }
    let placement = if cli.floating {
        Placement::Floating
    } else {
        Placement::Toolbar
    };

    match cli.command {
        Commands::Scan { page, json, out } => {
            commands::scan(&page, store, &selectors, placement, json, out.as_deref()).await
        }
        Commands::Config {
            enabled,
            threshold,
            grid_columns,
        } => {
            if enabled.is_some() || threshold.is_some() || grid_columns.is_some() {
                commands::update_config(&store, enabled, threshold, grid_columns).await?;
            }
            commands::show_config(&store).await
        }
        Commands::Watch {
            page,
            out,
            quiet_ms,
            safety_net_ms,
        } => {
            let mut config = WatcherConfig {
                placement,
                ..WatcherConfig::default()
            };
            if let Some(ms) = quiet_ms {
                config.quiet = Duration::from_millis(ms);
            }
            if let Some(ms) = safety_net_ms {
                config.safety_net = Duration::from_millis(ms.max(1));
            }
            let session = Session::start(page, out, store, selectors, config).await?;
            let result = run_repl(&session).await;
            session.shutdown().await;
            result
        }
    }
}

async fn run_repl(session: &Session) -> Result<(), String> {
    let mut prompt = Prompt::new();
    while let Some(line) = prompt.readline().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match repl::respond(line, session).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}
