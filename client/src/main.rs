use std::{env, sync::Arc};

use client::{
    api::HttpRoomsApi,
    config::ClientConfig,
    context::AppContext,
    logging,
    navigation::{HistoryNavigator, Location},
    room_sync::{RoomSync, TcpRoomFeed},
    state_store::{storage::FileStorage, PersistenceAdapter, Store},
    termination::create_termination,
    ui_management::UiManager,
};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    logging::init(&config.log_file())?;
    info!(
        api_url = %config.api_url,
        feed_addr = %config.feed_addr,
        data_dir = %config.data_dir.display(),
        "starting chat rooms client"
    );

    let store = Store::new(PersistenceAdapter::new(Arc::new(FileStorage::new(
        &config.data_dir,
    ))));
    store.init();

    let room_sync = RoomSync::new(
        store.clone(),
        Arc::new(TcpRoomFeed::new(config.feed_addr.clone())),
    );
    let api = Arc::new(HttpRoomsApi::new(config.api_url.clone()));

    // an optional starting location, like `/chat?room=AXFTR1`
    let initial_location = env::args()
        .nth(1)
        .map(|raw| Location::parse(&raw))
        .unwrap_or_default();
    let (navigator, route_rx) = HistoryNavigator::new(initial_location);

    let ctx = AppContext::new(store, room_sync, api, Arc::new(navigator));
    let (terminator, interrupt_rx) = create_termination();

    let interrupted = UiManager::new(ctx)
        .main_loop(terminator, route_rx, interrupt_rx)
        .await?;

    info!(?interrupted, "exited");

    Ok(())
}
