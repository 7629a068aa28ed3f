//! apps-broker-mcp — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use apps_broker::{HttpAppsGateway, HttpAuthGateway, RequestDispatcher, SessionStore};

use apps_broker_mcp::config::ServerConfig;
use apps_broker_mcp::protocol::ProtocolHandler;
use apps_broker_mcp::tools::ToolRegistry;
use apps_broker_mcp::transport::StdioTransport;
use apps_broker_mcp::types::InitializeResult;

#[derive(Parser)]
#[command(
    name = "apps-broker-mcp",
    about = "MCP server exposing Smart2Go app management tools over JSON-RPC",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server over stdio (default).
    Serve {
        /// Import storage root. Overrides MCP_IMPORT_APPS_DIR.
        #[arg(long)]
        import_apps_dir: Option<String>,

        /// Upstream base URL for both auth and apps endpoints.
        /// Overrides MCP_AUTH_BASE_URL / MCP_APPS_BASE_URL.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Start the MCP server over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,

        /// Import storage root. Overrides MCP_IMPORT_APPS_DIR.
        #[arg(long)]
        import_apps_dir: Option<String>,

        /// Upstream base URL for both auth and apps endpoints.
        #[arg(long)]
        base_url: Option<String>,

        /// Bearer token required on /mcp.
        /// Also reads from MCP_HTTP_AUTH_TOKEN.
        #[arg(long)]
        token: Option<String>,
    },

    /// Print server capabilities and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn build_dispatcher(config: &ServerConfig) -> Arc<RequestDispatcher> {
    let sessions = Arc::new(SessionStore::new(
        config.default_session_token.clone(),
        config.http_auth_token.clone(),
    ));
    sessions.preload(config.default_client_id.as_deref());

    Arc::new(RequestDispatcher::new(
        Arc::new(HttpAuthGateway::new(&config.auth_base_url)),
        Arc::new(HttpAppsGateway::new(&config.apps_base_url)),
        sessions,
        config.import_apps_dir.clone(),
    ))
}

fn apply_overrides(
    config: &mut ServerConfig,
    import_apps_dir: Option<String>,
    base_url: Option<String>,
) {
    if let Some(dir) = import_apps_dir {
        config.import_apps_dir = dir.into();
    }
    if let Some(url) = base_url {
        config.auth_base_url = url.clone();
        config.apps_base_url = url;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // stdout is the protocol channel; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve {
        import_apps_dir: None,
        base_url: None,
    }) {
        Commands::Serve {
            import_apps_dir,
            base_url,
        } => {
            let mut config = ServerConfig::from_env();
            apply_overrides(&mut config, import_apps_dir, base_url);
            config.log_startup();

            let dispatcher = build_dispatcher(&config);
            let handler = ProtocolHandler::new(dispatcher, config.override_enabled);
            StdioTransport::new(handler).run().await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp {
            addr,
            import_apps_dir,
            base_url,
            token,
        } => {
            use apps_broker_mcp::transport::HttpTransport;

            let mut config = ServerConfig::from_env();
            apply_overrides(&mut config, import_apps_dir, base_url);
            // CLI flag wins over the environment.
            let effective_token = token.or_else(|| config.http_auth_token.clone());
            config.log_startup();

            if effective_token.is_some() {
                tracing::info!("Auth: bearer token required on /mcp");
            }

            let dispatcher = build_dispatcher(&config);
            let handler = ProtocolHandler::new(dispatcher, config.override_enabled);
            HttpTransport::new(handler, effective_token).run(&addr).await?;
        }

        Commands::Info => {
            let capabilities = InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "apps-broker-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}
