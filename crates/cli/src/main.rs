use std::sync::Arc;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    selkie_automation::RemoteProvider,
    selkie_gateway::{GatewayConfig, GatewayState},
};

#[derive(Parser)]
#[command(name = "selkie", about = "Selkie — browser automation over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides SELKIE_BIND).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides SELKIE_PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Automation engine base URL (overrides SELKIE_ENGINE_URL).
    #[arg(long, global = true)]
    engine_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Print the tool catalog and exit.
    Tools,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Gateway) => {
            info!(version = env!("CARGO_PKG_VERSION"), "selkie starting");

            // Environment first, CLI flags override.
            let mut config = GatewayConfig::from_env();
            if let Some(bind) = cli.bind {
                config.bind = bind;
            }
            if let Some(port) = cli.port {
                config.port = port;
            }
            if let Some(url) = cli.engine_url {
                config.engine.base_url = url.trim_end_matches('/').to_string();
            }

            let provider = Arc::new(RemoteProvider::new(config.engine.clone())?);
            let state = GatewayState::new(config, provider)?;
            selkie_gateway::start(state).await
        },
        Some(Commands::Tools) => {
            let registry = selkie_tools::default_registry(
                selkie_gateway::config::DEFAULT_NAVIGATION_TIMEOUT_MS,
            )?;
            for tool in registry.descriptors() {
                println!("{:<28} {}", tool.name, tool.description.unwrap_or_default());
            }
            Ok(())
        },
    }
}
