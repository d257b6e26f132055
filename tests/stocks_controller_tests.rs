use axum::{
    Extension, Router,
    http::{Request, StatusCode, header},
    routing::get,
};
use http_body_util::BodyExt;
use mongodb::Client;
use mongodb::bson::oid::ObjectId;
use stockalert::{
    AppState, config, controllers::stocks_controller, engine, models::CurrentUser, services,
};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let settings = config::load();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(16);

    AppState {
        engine: engine::EngineHandle::new(db.clone(), events_tx.clone()),
        db,
        settings,
        market: services::market_data::MarketDataClient::new(
            "http://localhost:0".to_string(),
            String::new(),
        ),
        events_tx,
    }
}

fn test_user() -> CurrentUser {
    CurrentUser {
        id: ObjectId::new(),
        email: "test@example.com".to_string(),
        username: "TestUser".to_string(),
    }
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn prices_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/stocks/:id/prices/",
            get(stocks_controller::get_stock_prices).post(stocks_controller::post_stock_prices),
        )
        .layer(Extension(test_user()))
        .with_state(state)
}

#[tokio::test]
async fn get_stock_prices_with_malformed_id_returns_bad_request() {
    let app = prices_app(test_state().await);

    let req = Request::builder()
        .method("GET")
        .uri("/stocks/not-an-oid/prices/")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid stock id"));
}

#[tokio::test]
async fn post_stock_prices_with_malformed_id_returns_bad_request() {
    let app = prices_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/stocks/not-an-oid/prices/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::json!({
                "timestamp": 1_700_000_000,
                "open_price": 10.0,
                "close_price": 10.5
            })
            .to_string(),
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_stock_prices_rejects_nonpositive_close() {
    let app = prices_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/stocks/{}/prices/", ObjectId::new().to_hex()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::json!({
                "timestamp": 1_700_000_000,
                "open_price": 10.0,
                "close_price": 0.0
            })
            .to_string(),
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Close price must be positive."));
}

#[tokio::test]
async fn post_stock_prices_rejects_nonpositive_timestamp() {
    let app = prices_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/stocks/{}/prices/", ObjectId::new().to_hex()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::json!({
                "timestamp": -5,
                "open_price": 10.0,
                "close_price": 10.5
            })
            .to_string(),
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Timestamp must be positive."));
}
