use std::net::SocketAddr;

use mongodb::Client;
use tokio::sync::broadcast;

use stockalert::{config, engine, routes, services, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = services::db_init::ensure_indexes(&db).await {
        tracing::warn!("index setup failed: {}", e);
    }

    let (events_tx, _events_rx) = broadcast::channel::<String>(64);

    let state = AppState {
        engine: engine::EngineHandle::new(db.clone(), events_tx.clone()),
        db,
        settings: settings.clone(),
        market: services::market_data::MarketDataClient::new(
            settings.market_api_url.clone(),
            settings.market_api_key.clone(),
        ),
        events_tx,
    };

    services::price_poller::spawn_price_poller(state.clone());

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings.host.parse::<std::net::IpAddr>().unwrap(),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
