//! `vpcviz serve`: refresh engine plus HTTP server, until a signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use vpcviz_config::Config;
use vpcviz_core::{Engine, Inventory};

use super::Source;
use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::server::{self, AppState};

pub async fn handle(args: &ServeArgs, cfg: &Config) -> Result<(), CliError> {
    let engine_config = vpcviz_config::to_engine_config(&cfg.engine);
    let addr = args.listen.unwrap_or(cfg.listen);

    match Source::resolve(cfg, args.fixture.as_deref())? {
        Source::Live(client) => run(Engine::new(engine_config, client), cfg, addr).await,
        Source::Fixture(fixture) => run(Engine::new(engine_config, fixture), cfg, addr).await,
    }
}

async fn run<I: Inventory>(engine: Engine<I>, cfg: &Config, addr: SocketAddr) -> Result<(), CliError> {
    // Bind before starting the engine so a taken port fails fast.
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local = listener.local_addr()?;

    let shutdown = engine.cancel_token().clone();
    engine.start().await?;

    let state = AppState {
        store: Arc::clone(engine.store()),
        publisher: engine.publisher(),
        shutdown: shutdown.clone(),
    };
    let app = server::router(state, cfg.feed_mode, &cfg.assets_dir);

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            server::shutdown_signal().await;
            shutdown.cancel();
        }
    });

    tracing::info!(
        addr = %local,
        feed_mode = ?cfg.feed_mode,
        refresh_interval = ?engine.config().refresh_interval,
        push_interval = ?engine.config().push_interval,
        "serving topology views"
    );

    let served = server::serve(listener, app, shutdown).await;
    engine.shutdown().await;
    tracing::info!("server stopped");
    served?;
    Ok(())
}
