use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use mongodb::bson::doc;
use serde_json::json;

use crate::AppState;

// GET /health
pub async fn health() -> Response {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().timestamp(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

// GET /health/db
pub async fn health_db(State(state): State<AppState>) -> Response {
    match state.db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => Json(json!({ "status": "OK", "database": "OK" })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "ERROR", "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Not found" })),
    )
        .into_response()
}
