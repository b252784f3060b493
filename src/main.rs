//! fnhost CLI entry point.
//!
//! This is the main entry point for running the fnhost HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fnhost_common::ConfigFile;
use fnhost_server::{FnServer, ServerConfig};

/// Minimal function-as-a-service runtime.
#[derive(Debug, Parser)]
#[command(name = "fnhost", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file.
    #[arg(long, env = "FNHOST_BIND_ADDR")]
    bind_addr: Option<SocketAddr>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Fmt)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines.
    Fmt,
    /// One JSON object per line.
    Json,
}

fn init_tracing(format: LogFormat) {
    let json = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());
    let text = (format == LogFormat::Fmt).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fnhost=debug".into()),
        )
        .with(json)
        .with(text)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    info!("Starting fnhost");

    // Load configuration
    let file = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => ConfigFile::default(),
    };

    let mut server_config =
        ServerConfig::from_file(&file.server).context("Invalid [server] configuration")?;
    if let Some(addr) = cli.bind_addr {
        server_config = server_config.with_bind_addr(addr);
    }

    info!(
        bind_addr = %server_config.bind_addr,
        source_dir = %file.runtime.paths.source_dir.display(),
        artifact_dir = %file.runtime.paths.artifact_dir.display(),
        registry_file = %file.runtime.paths.registry_file.display(),
        toolchain = %file.runtime.build.program,
        "Configuration loaded"
    );

    // Create and run server
    let server = FnServer::new(&file.runtime, server_config)
        .await
        .context("Failed to initialize server")?;

    info!(
        functions = server.state().registry().len(),
        "Server initialized. Available endpoints:"
    );
    info!("  GET  /                    - Liveness");
    info!("  PUT  /register            - Register a function");
    info!("  GET  /functions           - List registered functions");
    info!("  ANY  /<name>              - Invoke an HTTP-bound function");

    server.run().await.context("Server terminated with an error")?;

    Ok(())
}
