//! forgebot daemon: subscribe to the configured relays, run every inbound
//! message through the admission pipeline, and keep the escalation purge
//! loop alive until shutdown.

mod builder;
mod workspace;

use std::sync::Arc;

use forgebot_core::{BotConfig, ErrorEscalator, Orchestrator, ReplySink};
use forgebot_relay::{EventSigner, RelayPool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env if present (before any env::var calls).
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[forgebot] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_env().expect("load forgebot configuration");
    let signer = EventSigner::from_hex(&config.secret_key).expect("parse FORGEBOT_SECRET_KEY");

    tracing::info!(
        relays = config.relays.len(),
        public_key = signer.public_key(),
        builder = %config.builder_cmd,
        "forgebot starting"
    );

    let pool = Arc::new(RelayPool::new(config.relays.clone(), signer));
    let escalator = Arc::new(ErrorEscalator::new(config.security.error_threshold));
    let orchestrator = Arc::new(Orchestrator::new(
        config.security.clone(),
        config.execution.clone(),
        Arc::clone(&escalator),
        Arc::clone(&pool) as Arc<dyn ReplySink>,
        Arc::new(workspace::ProjectWorkspace::new(config.project_root.clone())),
        Arc::new(builder::BuilderCli::new(config.builder_cmd.clone())),
    ));

    let maintenance = forgebot_core::spawn_purge_loop(escalator, config.purge_interval);

    // Only messages posted from now on are of interest.
    let since = chrono::Utc::now().timestamp();
    let (mut messages, subscription) = pool.subscribe(since);

    loop {
        tokio::select! {
            message = messages.recv() => {
                match message {
                    Some(message) => {
                        let orchestrator = Arc::clone(&orchestrator);
                        tokio::spawn(async move {
                            orchestrator.handle_message(message).await;
                        });
                    }
                    None => {
                        tracing::warn!("all relay streams ended");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    subscription.close().await;
    maintenance.stop().await;
    tracing::info!("forgebot stopped");
}
