use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    models::{Alert, CurrentUser, TriggeredAlert},
    services::{alerts_service, auth_service::FieldErrors},
};

fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "stock": a.stock_id.to_hex(),
        "stock_symbol": a.symbol,
        "alert_type": a.alert_type,
        "condition": a.condition,
        "threshold_price": a.threshold_price,
        "duration_minutes": a.duration_minutes,
        "description": a.description,
        "is_active": a.is_active,
        "created_at": a.created_at,
        "updated_at": a.updated_at,
    })
}

fn triggered_json(t: &TriggeredAlert) -> serde_json::Value {
    json!({
        "id": t.id.to_hex(),
        "alert": t.alert_id.to_hex(),
        "stock": t.stock_id.to_hex(),
        "stock_symbol": t.symbol,
        "alert_type": t.alert_type,
        "condition": t.condition,
        "threshold_price": t.threshold_price,
        "trigger_price": t.trigger_price,
        "sample_ts": t.sample_ts,
        "triggered_at": t.triggered_at,
    })
}

fn bad_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": "Invalid alert id" })),
    )
        .into_response()
}

fn db_error(e: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": format!("db error: {e}") })),
    )
        .into_response()
}

fn field_errors(errs: FieldErrors) -> Response {
    let mut errors = serde_json::Map::new();
    for (k, v) in errs {
        errors.insert(k, json!(v));
    }

    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "errors": errors })),
    )
        .into_response()
}

// ---------------- Alerts CRUD ----------------

#[derive(Deserialize)]
pub struct AlertsQuery {
    pub is_active: Option<bool>,
    pub symbol: Option<String>,
}

// GET /alerts/
pub async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
    Extension(u): Extension<CurrentUser>,
) -> Response {
    let alerts = match alerts_service::list_user_alerts(
        &state,
        u.id,
        query.is_active,
        query.symbol.as_deref(),
    )
    .await
    {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = alerts.iter().map(alert_json).collect();

    Json(json!({ "success": true, "count": items.len(), "data": items })).into_response()
}

#[derive(Deserialize)]
pub struct CreateAlertPayload {
    pub stock: String,
    pub alert_type: String,
    pub condition: String,
    pub target_price: f64,

    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

// POST /alerts/
pub async fn post_alert(
    State(state): State<AppState>,
    Extension(u): Extension<CurrentUser>,
    Json(payload): Json<CreateAlertPayload>,
) -> Response {
    let input = alerts_service::NewAlert {
        stock: payload.stock,
        alert_type: payload.alert_type.trim().to_lowercase(),
        condition: payload.condition.trim().to_lowercase(),
        target_price: payload.target_price,
        duration_minutes: payload.duration_minutes,
        description: payload.description,
        is_active: payload.is_active.unwrap_or(true),
    };

    match alerts_service::create_alert(&state, u.id, input).await {
        Ok(alert) => {
            tracing::info!("alert created: {} {} for {}", alert.id, alert.symbol, u.username);

            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "message": "Alert created successfully",
                    "data": alert_json(&alert),
                })),
            )
                .into_response()
        }
        Err(errs) => field_errors(errs),
    }
}

#[derive(Deserialize)]
pub struct UpdateAlertPayload {
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

// PUT /alerts/:id/
pub async fn put_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(u): Extension<CurrentUser>,
    Json(payload): Json<UpdateAlertPayload>,
) -> Response {
    let Ok(alert_id) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    let changes = alerts_service::AlertChanges {
        condition: payload.condition.map(|c| c.trim().to_lowercase()),
        target_price: payload.target_price,
        duration_minutes: payload.duration_minutes,
        description: payload.description,
        is_active: payload.is_active,
    };

    match alerts_service::update_alert(&state, u.id, alert_id, changes).await {
        Ok(alert) => Json(json!({
            "success": true,
            "message": "Alert updated successfully",
            "data": alert_json(&alert),
        }))
        .into_response(),
        Err(errs) => {
            if errs.get("_form").map(|m| m == "Alert not found.").unwrap_or(false) {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "success": false, "error": "Alert not found" })),
                )
                    .into_response();
            }
            field_errors(errs)
        }
    }
}

// DELETE /alerts/:id/
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(u): Extension<CurrentUser>,
) -> Response {
    let Ok(alert_id) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::delete_alert(&state, u.id, alert_id).await {
        Ok(true) => {
            Json(json!({ "success": true, "message": "Alert deleted successfully" })).into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Alert not found" })),
        )
            .into_response(),
        Err(e) => db_error(e),
    }
}

// ---------------- Triggered alerts ----------------

#[derive(Deserialize)]
pub struct TriggeredQuery {
    pub days: Option<i64>,
}

// GET /alerts/triggered/
pub async fn get_triggered(
    State(state): State<AppState>,
    Query(query): Query<TriggeredQuery>,
    Extension(u): Extension<CurrentUser>,
) -> Response {
    let days = query.days.filter(|d| *d > 0);

    let triggered = match alerts_service::list_triggered(&state, u.id, days).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = triggered.iter().map(triggered_json).collect();

    Json(json!({ "success": true, "count": items.len(), "data": items })).into_response()
}

// ---------------- Statistics ----------------

// GET /alerts/statistics/
pub async fn get_statistics(
    State(state): State<AppState>,
    Extension(u): Extension<CurrentUser>,
) -> Response {
    let stats = match alerts_service::statistics(&state, u.id).await {
        Ok(s) => s,
        Err(e) => return db_error(e),
    };

    Json(json!({
        "success": true,
        "data": {
            "total_alerts": stats.total_alerts,
            "active_alerts": stats.active_alerts,
            "inactive_alerts": stats.inactive_alerts,
            "total_triggered": stats.total_triggered,
            "triggered_this_week": stats.triggered_this_week,
            "triggered_this_month": stats.triggered_this_month,
            "alert_types": {
                "threshold": stats.threshold_alerts,
                "duration": stats.duration_alerts,
            }
        }
    }))
    .into_response()
}
