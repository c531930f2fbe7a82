//! `parlord` — broadcast chat server over a hand-rolled WebSocket layer.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parlor_server::config::Config;
use parlor_server::metrics;
use parlor_server::names::{NameSink, SqliteNameStore};
use parlor_server::server::Server;
use parlor_server::ws::registry::ChatRoom;
use parlor_server::ws::router::Router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::parse();
    let metrics_handle = metrics::install_recorder();

    let names: Option<Arc<dyn NameSink>> = if cfg.no_name_store {
        None
    } else {
        let store = SqliteNameStore::open(&cfg.names_db)
            .with_context(|| format!("opening name store at {}", cfg.names_db.display()))?;
        Some(Arc::new(store))
    };

    let room = Arc::new(ChatRoom::new());
    let router = Arc::new(Router::new(room, names));

    let server = Server::bind(&cfg, router, Some(metrics_handle))
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    info!(
        addr = %server.local_addr()?,
        public_dir = %cfg.public_dir.display(),
        "listening"
    );

    tokio::select! {
        result = server.run() => result.context("accept loop failed")?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}
