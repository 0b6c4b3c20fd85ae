use std::sync::Arc;

use tokio::net::TcpListener;
use traced_hello::config::Config;
use traced_hello::error::Error;
use traced_hello::telemetry::Telemetry;
use traced_hello::{forward, server, AppState};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let config = Config::from_env_for_forwarder()?;
    let telemetry = Arc::new(Telemetry::init(&config)?);
    let state = Arc::new(AppState::new(config, telemetry.clone()));

    let listener = TcpListener::bind(state.config.listen_addr).await?;
    info!(addr = %state.config.listen_addr, service = %state.config.service_name, "listening");

    tokio::select! {
        res = server::serve(listener, state, forward::router) => res?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    telemetry.shutdown();
    Ok(())
}
