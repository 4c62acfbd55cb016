use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use common::link_store::{MemoryLinkStore, MongoLinkStore};
use common::upstream::MockUpstream;
use common::{GatewayConfig, LinkStore, UpstreamBackend};

use server::http;
use server::state::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Arc::new(GatewayConfig::parse());

    let link_store: Arc<dyn LinkStore> = if config.uses_durable_link_store() {
        Arc::new(MongoLinkStore::connect(&config.database_url).await?)
    } else {
        tracing::warn!("DATABASE_URL not set, using in-memory link store");
        Arc::new(MemoryLinkStore::new())
    };

    // No real upstream client is wired up here: the gateway is built
    // generically against `UpstreamBackend`, and a production deployment
    // supplies its own implementation of that trait. `MockUpstream` keeps
    // this binary runnable end to end without one.
    tracing::warn!("using the in-process mock upstream backend; not suitable for production");
    let upstream: Arc<dyn UpstreamBackend> = Arc::new(MockUpstream::new());

    let state = Arc::new(AppState::new(config.clone(), link_store, upstream));
    state::spawn_descriptor_cache_flush(state.clone());

    let socket: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
    http::svc::serve(socket, state).await
}
