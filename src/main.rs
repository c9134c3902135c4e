//! Workbench CLI entry point.
//!
//! - `workbench serve` runs the HTTP server
//! - `workbench run <file>` runs one source file and prints its report
//! - `workbench terminal` starts the interactive terminal

mod terminal;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workbench_common::{ConfigFile, WorkbenchConfig};
use workbench_core::{ExecutionEngine, InMemorySurface, InputProvider};
use workbench_host::assemble_engine;
use workbench_server::{ServerConfig, WorkbenchServer};

use crate::terminal::{language_for_path, stdin_lines, TerminalInput};

#[derive(Parser, Debug)]
#[clap(name = "workbench", version, about = "Multi-language code execution workbench")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// TOML configuration file.
    #[clap(long, short, global = true, env = "WORKBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Remote execution client id.
    #[clap(long, global = true, env = "JDOODLE_CLIENT_ID", hide_env_values = true)]
    client_id: Option<String>,

    /// Remote execution client secret.
    #[clap(long, global = true, env = "JDOODLE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Log output format.
    #[clap(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind, overrides the config file.
        #[clap(long, env = "BIND_ADDR")]
        bind_addr: Option<SocketAddr>,
    },
    /// Run one source file and print the report
    Run {
        /// Source file.
        file: PathBuf,

        /// Language id; detected from the file extension when omitted.
        #[clap(long, short)]
        language: Option<String>,

        /// Program input. `-` reads it from this process's stdin.
        #[clap(long)]
        stdin: Option<String>,
    },
    /// Start the interactive terminal
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat, default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let (text, json) = match format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<ConfigFile> {
    let mut file = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigFile::default(),
    };

    if let Some(id) = &cli.client_id {
        file.workbench.remote.client_id = Some(id.clone());
    }
    if let Some(secret) = &cli.client_secret {
        file.workbench.remote.client_secret = Some(secret.clone());
    }
    Ok(file)
}

fn build_engine(
    config: &WorkbenchConfig,
    input: Option<Arc<dyn InputProvider>>,
) -> anyhow::Result<ExecutionEngine> {
    assemble_engine(config, Arc::new(InMemorySurface::new()), input)
        .context("Failed to initialize the execution engine")
}

async fn serve(file: &ConfigFile, bind_addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let mut server_config = ServerConfig::from_file(&file.server)?;
    if let Some(addr) = bind_addr {
        server_config = server_config.with_bind_addr(addr);
    }
    info!(bind_addr = %server_config.bind_addr, "Configuration loaded");

    let server = WorkbenchServer::new(&file.workbench, server_config)?;

    info!("Server initialized. Available endpoints:");
    info!("  POST /run                     - Run a program");
    info!("  GET  /languages               - Supported languages");
    info!("  GET  /languages/:id/template  - Starter program");
    info!("  GET  /preview                 - HTML preview");
    info!("  POST /runtime/preload         - Warm up the Python runtime");
    info!("  GET  /health                  - Health check");
    info!("  GET  /ready                   - Readiness check");

    server.run().await?;
    Ok(())
}

async fn run_file(
    file: &ConfigFile,
    path: &Path,
    language: Option<String>,
    stdin: Option<String>,
) -> anyhow::Result<ExitCode> {
    let language = match language {
        Some(language) => language,
        None => language_for_path(path)
            .map(|l| l.as_str().to_string())
            .with_context(|| {
                format!(
                    "Cannot detect language for {}; pass --language",
                    path.display()
                )
            })?,
    };
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let (stdin, input) = match stdin.as_deref() {
        Some("-") => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read stdin")?;
            (Some(buffer), None)
        }
        Some(text) => (Some(text.to_string()), None),
        None => {
            let provider: Arc<dyn InputProvider> = Arc::new(TerminalInput::new(stdin_lines()));
            (None, Some(provider))
        }
    };

    let engine = build_engine(&file.workbench, input)?;
    let report = engine.run(&source, &language, stdin).await;
    println!("{}", report.render());

    Ok(if report.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // The server logs freely; run and terminal keep the console for output.
    let default_filter = match cli.command {
        Commands::Serve { .. } => "info,workbench=debug",
        Commands::Run { .. } | Commands::Terminal => "warn",
    };
    init_tracing(cli.log_format, default_filter);

    let file = load_config(&cli)?;

    match cli.command {
        Commands::Serve { bind_addr } => {
            serve(&file, bind_addr).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            file: path,
            language,
            stdin,
        } => run_file(&file, &path, language, stdin).await,
        Commands::Terminal => {
            let lines = stdin_lines();
            let input: Arc<dyn InputProvider> = Arc::new(TerminalInput::new(lines.clone()));
            let engine = build_engine(&file.workbench, Some(input))?;
            terminal::run_loop(Arc::new(engine), lines).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
