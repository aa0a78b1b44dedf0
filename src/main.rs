use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use markwhen_calendar::{
    config::{self, ClientConfig, DEFAULT_NAMESPACE},
    console::{ConsoleCommand, USAGE},
    error::Result,
    Actions, Projection, Transport, ViewClient,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::watch,
    time::sleep,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "markwhen-calendar")]
#[command(about = "Calendar view client for markwhen hosts")]
struct Cli {
    /// Log file (defaults to the cache directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the host's Unix socket; console commands are read from stdin
    Connect {
        #[arg(long)]
        socket: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// Use stdin/stdout as the channel to the host; events go to stderr
    Stdio {
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_path = cli.log_file.unwrap_or_else(config::log_path);
    let log_file = match open_log(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: cannot open log file {}: {e}", log_path.display());
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("markwhen_calendar=info".parse().unwrap()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Connect { socket, namespace } => {
            let config = ClientConfig {
                namespace,
                socket_path: socket.unwrap_or_else(config::socket_path),
            };
            run_connected(&config).await
        }
        Commands::Stdio { namespace } => run_stdio(namespace).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

async fn run_connected(config: &ClientConfig) -> Result<()> {
    let mut attempts = 0_u32;
    let client = loop {
        match ViewClient::connect(config).await {
            Ok(client) => break client,
            Err(e) => {
                if attempts == 0 {
                    eprintln!("Waiting for host at {}", config.socket_path.display());
                    tracing::warn!(
                        "Host not reachable at {}: {e}; retrying every second",
                        config.socket_path.display()
                    );
                } else {
                    tracing::debug!("Host still not reachable: {e}");
                }
                attempts = attempts.saturating_add(1);
                sleep(Duration::from_secs(1)).await;
            }
        }
    };

    tokio::spawn(print_projections(client.subscribe(), tokio::io::stdout()));
    tokio::spawn(read_console(client.actions(), client.shutdown_token()));

    let reason = client.run().await;
    tracing::info!("Stopped: {reason:?}");
    reason.into_result()
}

async fn run_stdio(namespace: String) -> Result<()> {
    let client = ViewClient::new(Transport::stdio(namespace));
    tokio::spawn(print_projections(client.subscribe(), tokio::io::stderr()));

    let reason = client.run().await;
    tracing::info!("Stopped: {reason:?}");
    reason.into_result()
}

/// Write every new projection as one JSON line.
async fn print_projections<W>(mut rx: watch::Receiver<Projection>, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    while rx.changed().await.is_ok() {
        let events = rx.borrow_and_update().clone();
        let Ok(json) = serde_json::to_string(&*events) else {
            continue;
        };
        if out.write_all(format!("{json}\n").as_bytes()).await.is_err() {
            break;
        }
        let _ = out.flush().await;
    }
}

async fn read_console(actions: Actions, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match ConsoleCommand::parse(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => {
                for handle in command.issue(&actions) {
                    tokio::spawn(async move {
                        match handle.await {
                            Ok(response) => tracing::debug!("{} answered", response.kind),
                            Err(e) => tracing::debug!("{e}"),
                        }
                    });
                }
            }
            Err(e) => eprintln!("{e}\n{USAGE}"),
        }
    }
    shutdown.cancel();
}
