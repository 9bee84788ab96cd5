//! MCP stdio server running Python and C++ inside an embedded ROOT interpreter
//!
//! The binary boots the interpreter once, then serves `run_python` and
//! `run_cpp` over the Model Context Protocol on stdin/stdout. Protocol frames
//! and log lines go through private duplicates of the original descriptors, so
//! the per-execution capture of descriptors 1 and 2 cannot touch them.

mod control;
mod handler;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use rmcp::ServiceExt;
use root_mcp_core::{
    ConfigLoader, ExecutionDispatcher, GatewayConfig, RootRuntime, ToolFactory,
};
use std::path::PathBuf;
use std::sync::Arc;

use control::ControlChannel;
use handler::RootMcpHandler;

#[derive(Parser, Debug)]
#[clap(author, version, about = "ROOT MCP - run Python and C++ in an embedded ROOT interpreter")]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(long, short, help = "Configuration file (defaults to the user config directory)")]
    config: Option<PathBuf>,

    #[clap(long, help = "Run ROOT in batch mode (no graphics)")]
    no_graphics: bool,

    #[clap(long, short, help = "Log level (error, warn, info, debug, trace)")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the tools over stdio (default command)
    Serve,
    /// Print the available tools and exit
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Tools) = cli.command {
        for tool in ToolFactory::default_tool_metadata() {
            println!("{:<12} {}", tool.name, tool.description);
        }
        return Ok(());
    }

    let control = ControlChannel::protect().context("Failed to protect the control channel")?;

    let mut config = ConfigLoader::load(cli.config.as_deref()).await?;
    if cli.no_graphics {
        config.interpreter.graphics = false;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config, &control)?;

    run_server(config, control).await
}

fn init_logging(config: &GatewayConfig, control: &ControlChannel) -> Result<()> {
    let level: LevelFilter = config.logging.level_filter()?;
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Pipe(Box::new(control.log_writer()?)))
        .init();
    Ok(())
}

async fn run_server(config: GatewayConfig, control: ControlChannel) -> Result<()> {
    let runtime = RootRuntime::initialize(config.runtime_options())
        .context("Failed to initialize the ROOT interpreter")?;
    log::info!(
        "ROOT interpreter ready (graphics: {}, implicit MT: {})",
        runtime.options().graphics,
        runtime.implicit_mt_enabled()
    );

    let executor = Arc::new(runtime.executor(config.executor_settings()));
    let dispatcher =
        Arc::new(ExecutionDispatcher::new(executor).with_code_logging(config.execution.log_code));
    let registry = Arc::new(ToolFactory::create_default_registry(dispatcher));
    log::info!("Registered {} tools", registry.tool_count());

    let transport = (tokio::io::stdin(), control.transport_writer()?);
    let service = RootMcpHandler::new(registry)
        .serve(transport)
        .await
        .context("Failed to start MCP session")?;
    log::info!("🚀 ROOT MCP server listening on stdio");

    let reason = service.waiting().await?;
    log::info!("MCP session ended: {:?}", reason);
    Ok(())
}
