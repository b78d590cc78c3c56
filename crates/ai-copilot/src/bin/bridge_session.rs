//! The bridge-session service: listens for edge media adapter
//! connections and runs one [`BridgeSession`] per call (spec §4.6).

use std::sync::Arc;

use clap::Parser;
use rvoip_ai_copilot::config::{ListenerConfig, PromptConfigRegistry};
use rvoip_ai_copilot::session::BridgeSession;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "bridge-session", about = "Bridge-side AI session service")]
struct Args {
    /// Address to listen for edge media adapter connections on.
    #[arg(long, default_value = "0.0.0.0:8085")]
    listen: String,

    /// Websocket endpoint of the speech-to-speech AI provider.
    #[arg(long, default_value = "wss://localhost:9443/ai-session")]
    ai_provider_url: String,

    /// Tracing filter, e.g. "info" or "rvoip_ai_copilot=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level))
        .init();

    let listener_config = ListenerConfig::default()
        .with_bind_addr(args.listen.clone())
        .with_ai_provider_url(args.ai_provider_url.clone());
    let prompts = Arc::new(PromptConfigRegistry::default());

    let listener = TcpListener::bind(&listener_config.bind_addr).await?;
    info!(addr = %listener_config.bind_addr, ai_provider_url = %listener_config.ai_provider_url, "bridge-session listening");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept an edge connection");
                continue;
            }
        };
        info!(%peer, "accepted edge connection");

        let prompts = prompts.clone();
        let listener_config = listener_config.clone();
        tokio::spawn(async move {
            let session = BridgeSession::new(prompts, listener_config);
            if let Err(e) = session.run(socket).await {
                error!(%peer, error = %e, "call session ended with an error");
            }
        });
    }
}
