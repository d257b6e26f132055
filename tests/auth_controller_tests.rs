use axum::{
    Router,
    http::{Request, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use mongodb::Client;
use mongodb::bson::oid::ObjectId;
use stockalert::{AppState, auth, config, controllers::auth_controller, engine, services};
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

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn post_login_missing_fields_returns_errors() {
    let state = test_state().await;
    let app = Router::new()
        .route("/auth/login/", post(auth_controller::post_login))
        .with_state(state);

    let req = json_request(
        "/auth/login/",
        serde_json::json!({ "email": "", "password": "" }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Email is required."));
    assert!(body.contains("Password is required."));
}

#[tokio::test]
async fn post_login_invalid_email_returns_error() {
    let state = test_state().await;
    let app = Router::new()
        .route("/auth/login/", post(auth_controller::post_login))
        .with_state(state);

    let req = json_request(
        "/auth/login/",
        serde_json::json!({ "email": "not-an-email", "password": "123456" }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid email."));
    assert!(!body.contains("Password is required."));
}

#[tokio::test]
async fn post_register_short_password_returns_error() {
    let state = test_state().await;
    let app = Router::new()
        .route("/auth/register/", post(auth_controller::post_register))
        .with_state(state);

    let req = json_request(
        "/auth/register/",
        serde_json::json!({
            "username": "TestUser",
            "email": "test@example.com",
            "password": "123"
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("at least 6 characters"));
}

#[tokio::test]
async fn post_register_short_username_returns_error() {
    let state = test_state().await;
    let app = Router::new()
        .route("/auth/register/", post(auth_controller::post_register))
        .with_state(state);

    let req = json_request(
        "/auth/register/",
        serde_json::json!({
            "username": "a",
            "email": "test@example.com",
            "password": "123456"
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("at least 2 characters"));
}

#[tokio::test]
async fn post_register_missing_username_returns_error() {
    let state = test_state().await;
    let app = Router::new()
        .route("/auth/register/", post(auth_controller::post_register))
        .with_state(state);

    let req = json_request(
        "/auth/register/",
        serde_json::json!({
            "username": "",
            "email": "test@example.com",
            "password": "123456"
        }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("Username is required."));
}

#[tokio::test]
async fn post_refresh_rejects_garbage_token() {
    let state = test_state().await;
    let app = Router::new()
        .route("/auth/token/refresh/", post(auth_controller::post_refresh))
        .with_state(state);

    let req = json_request(
        "/auth/token/refresh/",
        serde_json::json!({ "refresh": "not-a-jwt" }),
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid or expired refresh token"));
}

#[tokio::test]
async fn access_token_round_trips_through_claims() {
    let state = test_state().await;
    let user_id = ObjectId::new();

    let token = services::auth_service::make_access_token(&state, &user_id).unwrap();
    let claims = auth::decode_claims(&state, &token).expect("valid token");

    assert_eq!(claims.sub, user_id.to_hex());
    assert_eq!(claims.token_type, "access");
}

#[tokio::test]
async fn refresh_token_carries_refresh_type() {
    let state = test_state().await;
    let user_id = ObjectId::new();

    let token = services::auth_service::make_refresh_token(&state, &user_id).unwrap();
    let claims = auth::decode_claims(&state, &token).expect("valid token");

    assert_eq!(claims.token_type, "refresh");
}

#[tokio::test]
async fn refresh_endpoint_rejects_an_access_token() {
    let state = test_state().await;
    let user_id = ObjectId::new();

    // an access token is well-formed but must not mint new access tokens
    let access = services::auth_service::make_access_token(&state, &user_id).unwrap();

    let err = services::auth_service::refresh_access_token(&state, &access)
        .await
        .unwrap_err();
    assert!(err.contains("not a refresh token"));
}
