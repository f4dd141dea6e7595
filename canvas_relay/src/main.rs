use canvas_relay::{AppWsState, RelayConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canvas_relay=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env()?;
    let state = Arc::new(AppWsState::new(config.channel_capacity));

    // Bind to 0.0.0.0 by default so clients on other hosts/containers can reach us.
    let listener = TcpListener::bind(config.addr).await?;
    info!("🚀 Relay listening on {}", listener.local_addr()?);
    axum::serve(listener, canvas_relay::app(state)).await?;

    Ok(())
}
