use std::sync::Arc;

use anyhow::Context;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
    sync::broadcast,
    task::JoinSet,
};
use tracing::{info, warn};

use crate::{config::ServerConfig, room_manager::RoomManager};

mod config;
mod http;
mod logging;
mod room_manager;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let config = ServerConfig::from_env()?;

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let room_manager = Arc::new(RoomManager::new());

    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to create interrupt signal stream")?;
    let feed_server = TcpListener::bind(config.feed_addr())
        .await
        .with_context(|| format!("could not bind the feed to {}", config.feed_addr()))?;
    let http_listener = TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("could not bind http to {}", config.http_addr()))?;
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    let http_server = tokio::spawn({
        let mut quit_rx = quit_rx.resubscribe();
        let app = http::app(room_manager.clone());

        async move {
            axum::serve(http_listener, app)
                .with_graceful_shutdown(async move {
                    let _ = quit_rx.recv().await;
                })
                .await
        }
    });

    info!(
        feed_addr = %config.feed_addr(),
        http_addr = %config.http_addr(),
        "listening"
    );
    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                info!("server interrupted, gracefully shutting down");
                quit_tx.send(()).context("failed to send quit signal")?;
                break;
            }
            accepted = feed_server.accept() => match accepted {
                Ok((socket, peer)) => {
                    info!(%peer, "feed client connected");
                    join_set.spawn(session::handle_feed_session(
                        room_manager.clone(),
                        quit_rx.resubscribe(),
                        socket,
                    ));
                }
                Err(err) => warn!(?err, "could not accept a feed client"),
            }
        }
    }

    while let Some(result) = join_set.join_next().await {
        if let Ok(Err(err)) = result {
            warn!(?err, "feed session ended with an error");
        }
    }
    http_server
        .await
        .context("http server task failed")?
        .context("http server failed")?;

    info!("server shut down");

    Ok(())
}
