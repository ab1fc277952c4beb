//! Agent Hub - web agent server

use agenthub_core::{BindMode, Settings};
use agenthub_gateway::start_server;
use agenthub_llm::OpenAiCompatGateway;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agenthub", about = "Agent Hub - tool-using coding agent over WebSocket")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP + WebSocket server
    Serve {
        /// Path to agenthub.toml
        #[arg(short, long, env = "AGENTHUB_CONFIG", default_value = "agenthub.toml")]
        config: PathBuf,
        #[arg(short, long)]
        port: Option<u16>,
        /// `loopback` or `lan`
        #[arg(short, long)]
        bind: Option<String>,
        /// Default workspace for new sessions
        #[arg(short, long)]
        workspace: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve {
            config,
            port,
            bind,
            workspace,
            model,
            json_logs,
        }) => {
            init_tracing(json_logs);

            let mut settings = Settings::load(Some(config.as_path()))?;
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(bind) = bind {
                settings.server.bind = BindMode::parse(&bind);
            }
            if let Some(ws) = workspace {
                settings.default_workspace = ws;
            }
            if let Some(model) = model {
                settings.model = model;
            }
            serve(settings).await?;
        }

        Some(Commands::Version) => {
            println!("agenthub v{}", env!("CARGO_PKG_VERSION"));
        }

        // No subcommand = serve with defaults
        None => {
            init_tracing(false);
            serve(Settings::load(Some(std::path::Path::new("agenthub.toml")))?).await?;
        }
    }

    Ok(())
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    settings.validate()?;
    settings.warn_on_unsupported_model();

    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("XAI_API_KEY not set"))?;
    let gateway = OpenAiCompatGateway::new(api_key, settings.model.clone())?
        .with_base_url(settings.base_url.clone());

    start_server(settings, Arc::new(gateway)).await
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agenthub=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
