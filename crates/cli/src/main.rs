//! Perplexo binary: wires the answering backend, the dispatch engine, and
//! the WhatsApp transport together, then runs the session until the account
//! logs out or the process receives ctrl-c.

use {
    clap::Parser,
    std::sync::Arc,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    perplexo_backend::ApiClient,
    perplexo_bot::{ChatOutbound, Engine, InboundSink},
    perplexo_whatsapp::{SessionConfig, WaOutbound, session, shared_handle},
};

#[derive(Parser)]
#[command(name = "perplexo", about = "Perplexo - WhatsApp front-end for Perplexity-style answering")]
struct Cli {
    /// Base URL of the answering backend.
    #[arg(long, env = "MCP_API_URL", default_value = "http://127.0.0.1:5000")]
    api_url: String,

    /// WebSocket URL of the Baileys sidecar.
    #[arg(long, env = "SIDECAR_URL", default_value = "ws://127.0.0.1:3001")]
    sidecar_url: String,

    /// Session name the sidecar stores its credentials under.
    #[arg(long, env = "WHATSAPP_SESSION_NAME", default_value = "perplexo-session")]
    session: String,

    /// Phone number (digits only) notified whenever the session comes up.
    #[arg(long, env = "ADMIN_WHATSAPP_NUMBER")]
    admin_number: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
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
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "perplexo starting");

    let api = Arc::new(ApiClient::new(cli.api_url.clone(), "whatsapp"));

    // The bot still comes up when the backend is down; queries fail with a
    // user-facing error until it recovers.
    match api.health().await {
        Ok(health) => info!(
            status = %health.status,
            scraper_available = health.scraper_available,
            "backend reachable"
        ),
        Err(error) => warn!(url = %cli.api_url, %error, "backend health check failed"),
    }

    let shared = shared_handle();
    let outbound: Arc<dyn ChatOutbound> = Arc::new(WaOutbound::new(Arc::clone(&shared)));
    let engine: Arc<dyn InboundSink> = Arc::new(Engine::new(api, outbound));

    let config = SessionConfig {
        sidecar_url: cli.sidecar_url,
        session: cli.session,
        admin_number: cli.admin_number,
    };

    tokio::select! {
        () = session::run(config, shared, engine) => {
            info!("whatsapp session ended");
        },
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("shutting down");
        },
    }

    Ok(())
}
