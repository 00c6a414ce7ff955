//! mcp-tools-server: multi-transport JSON-RPC tool-invocation server
//!
//! Serves a catalogue of utility tools over stdio, HTTP REST, streamable
//! HTTP (POST + SSE), and WebSocket, all backed by one shared processor.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use mcp_tools_server::config::{self, ServerConfig};
use mcp_tools_server::server::{Server, TransportSelection};
use mcp_tools_server::tools::{ToolDirectory, ToolRegistry};

/// Multi-transport JSON-RPC tool-invocation server.
///
/// With no transport flag, all transports are enabled. Logging goes to
/// stderr so the stdio transport keeps stdout clean for protocol output.
#[derive(Parser, Debug)]
#[command(name = "mcp-tools-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable the stdio transport
    #[arg(long)]
    stdio: bool,

    /// Enable the HTTP REST API
    #[arg(long)]
    http: bool,

    /// Enable the streamable HTTP transport
    #[arg(long)]
    streamable: bool,

    /// Enable the WebSocket transport
    #[arg(long)]
    websocket: bool,

    /// Enable all transports (the default when no transport flag is given)
    #[arg(long)]
    all: bool,

    /// Override the HTTP REST port
    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Override the streamable HTTP port
    #[arg(long, value_name = "PORT")]
    streamable_port: Option<u16>,

    /// Override the WebSocket port
    #[arg(long, value_name = "PORT")]
    websocket_port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Resolves the transport flags into a selection.
    fn selection(&self) -> TransportSelection {
        let explicit = TransportSelection {
            stdio: self.stdio,
            http: self.http,
            streamable: self.streamable,
            websocket: self.websocket,
        };

        if self.all || !explicit.any() {
            TransportSelection::all()
        } else {
            explicit
        }
    }

    /// Applies the CLI port overrides on top of the environment config.
    fn apply_overrides(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(port) = self.streamable_port {
            config.streamable_port = port;
        }
        if let Some(port) = self.websocket_port {
            config.websocket_port = port;
        }
        config
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "info" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO, // Default to info for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the mcp-tools-server binary.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match config::load_config() {
        Ok(cfg) => args.apply_overrides(cfg),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // CLI overrides can reintroduce a port collision.
    if let Err(e) = cfg.validate() {
        eprintln!("Configuration error: {e}");
        return ExitCode::FAILURE;
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.log_level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting mcp-tools-server"
    );

    // Build the tool directory from the registry; startup fails only if
    // every registered tool fails to construct.
    let registry = ToolRegistry::new();
    let directory = match ToolDirectory::from_registry(&registry) {
        Ok(directory) => Arc::new(directory),
        Err(e) => {
            error!(error = %e, "Failed to create tools");
            return ExitCode::FAILURE;
        }
    };

    info!(tools = directory.len(), "Tool directory ready");

    let selection = args.selection();
    let server = Server::new(cfg, selection, directory);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn no_flags_selects_all_transports() {
        let args = Args::parse_from(["mcp-tools-server"]);
        assert_eq!(args.selection(), TransportSelection::all());
    }

    #[test]
    fn explicit_flags_select_only_those_transports() {
        let args = Args::parse_from(["mcp-tools-server", "--stdio", "--websocket"]);
        let selection = args.selection();
        assert!(selection.stdio);
        assert!(selection.websocket);
        assert!(!selection.http);
        assert!(!selection.streamable);
    }

    #[test]
    fn all_flag_wins_over_explicit_flags() {
        let args = Args::parse_from(["mcp-tools-server", "--all", "--stdio"]);
        assert_eq!(args.selection(), TransportSelection::all());
    }

    #[test]
    fn port_overrides_apply() {
        let args = Args::parse_from(["mcp-tools-server", "--http-port", "9999"]);
        let cfg = args.apply_overrides(ServerConfig::default());
        assert_eq!(cfg.http_port, 9999);
        assert_eq!(cfg.streamable_port, 8081);
    }

    #[test]
    fn log_level_from_flags() {
        assert_eq!(get_log_level(0, true, "info"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(1, false, "error"), Level::INFO);
        assert_eq!(get_log_level(3, false, "info"), Level::TRACE);
        assert_eq!(get_log_level(0, false, "bogus"), Level::INFO);
    }
}
