use axum::{
    Extension, Router,
    http::{Request, StatusCode, header},
    routing::{post, put},
};
use http_body_util::BodyExt;
use mongodb::Client;
use mongodb::bson::oid::ObjectId;
use stockalert::{
    AppState, config, controllers::alerts_controller, engine, models::CurrentUser, services,
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

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/alerts/", post(alerts_controller::post_alert))
        .layer(Extension(test_user()))
        .with_state(state)
}

#[tokio::test]
async fn post_alert_invalid_condition_returns_error() {
    let app = create_app(test_state().await);

    let req = json_request(
        "POST",
        "/alerts/",
        serde_json::json!({
            "stock": ObjectId::new().to_hex(),
            "alert_type": "threshold",
            "condition": "sideways",
            "target_price": 150.0
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Condition must be 'above' or 'below'."));
}

#[tokio::test]
async fn post_alert_invalid_type_returns_error() {
    let app = create_app(test_state().await);

    let req = json_request(
        "POST",
        "/alerts/",
        serde_json::json!({
            "stock": ObjectId::new().to_hex(),
            "alert_type": "sometimes",
            "condition": "above",
            "target_price": 150.0
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Alert type must be 'threshold' or 'duration'."));
}

#[tokio::test]
async fn post_alert_nonpositive_target_price_returns_error() {
    let app = create_app(test_state().await);

    let req = json_request(
        "POST",
        "/alerts/",
        serde_json::json!({
            "stock": ObjectId::new().to_hex(),
            "alert_type": "threshold",
            "condition": "above",
            "target_price": 0.0
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Target price must be positive."));
}

#[tokio::test]
async fn post_alert_duration_without_minutes_returns_error() {
    let app = create_app(test_state().await);

    let req = json_request(
        "POST",
        "/alerts/",
        serde_json::json!({
            "stock": ObjectId::new().to_hex(),
            "alert_type": "duration",
            "condition": "below",
            "target_price": 99.5
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Duration minutes is required for duration alerts."));
}

#[tokio::test]
async fn post_alert_duration_with_zero_minutes_returns_error() {
    let app = create_app(test_state().await);

    let req = json_request(
        "POST",
        "/alerts/",
        serde_json::json!({
            "stock": ObjectId::new().to_hex(),
            "alert_type": "duration",
            "condition": "below",
            "target_price": 99.5,
            "duration_minutes": 0
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Duration must be at least 1 minute."));
}

#[tokio::test]
async fn post_alert_invalid_stock_id_returns_error() {
    let app = create_app(test_state().await);

    let req = json_request(
        "POST",
        "/alerts/",
        serde_json::json!({
            "stock": "not-a-hex-id",
            "alert_type": "threshold",
            "condition": "above",
            "target_price": 150.0
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid stock id."));
}

#[tokio::test]
async fn put_alert_with_malformed_id_returns_bad_request() {
    let state = test_state().await;
    let app = Router::new()
        .route("/alerts/:id/", put(alerts_controller::put_alert))
        .layer(Extension(test_user()))
        .with_state(state);

    let req = json_request(
        "PUT",
        "/alerts/definitely-not-an-oid/",
        serde_json::json!({ "is_active": false }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid alert id"));
}

#[tokio::test]
async fn delete_alert_with_malformed_id_returns_bad_request() {
    let state = test_state().await;
    let app = Router::new()
        .route(
            "/alerts/:id/",
            axum::routing::delete(alerts_controller::delete_alert),
        )
        .layer(Extension(test_user()))
        .with_state(state);

    let req = Request::builder()
        .method("DELETE")
        .uri("/alerts/definitely-not-an-oid/")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
