use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    engine::{EngineError, NewSample},
    models::{PriceSample, Stock},
    services::stocks_service,
};

fn price_json(p: &PriceSample) -> serde_json::Value {
    json!({
        "id": p.id.to_hex(),
        "stock": p.stock_id.to_hex(),
        "timestamp": p.timestamp,
        "open_price": p.open_price,
        "close_price": p.close_price,
        "volume": p.volume,
    })
}

fn bad_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": "Invalid stock id" })),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Stock not found" })),
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

/// Latest price plus change against the previous sample, from the two
/// newest observations.
async fn price_summary(
    state: &AppState,
    stock_id: ObjectId,
) -> Result<(Option<f64>, serde_json::Value), String> {
    let samples = stocks_service::latest_samples(state, stock_id, 2).await?;

    let latest = samples.first().map(|p| p.close_price);

    let change = match (samples.first(), samples.get(1)) {
        (Some(current), Some(previous)) if previous.close_price != 0.0 => {
            let amount = current.close_price - previous.close_price;
            json!({
                "amount": amount,
                "percentage": amount / previous.close_price * 100.0,
            })
        }
        _ => serde_json::Value::Null,
    };

    Ok((latest, change))
}

#[derive(Deserialize)]
pub struct StocksQuery {
    pub symbol: Option<String>,
}

// GET /stocks/
pub async fn get_stocks(
    State(state): State<AppState>,
    Query(query): Query<StocksQuery>,
) -> Response {
    let stocks = match stocks_service::list_stocks(&state, query.symbol.as_deref()).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let mut items: Vec<serde_json::Value> = Vec::with_capacity(stocks.len());
    for stock in &stocks {
        let (latest_price, price_change_24h) = match price_summary(&state, stock.id).await {
            Ok(pair) => pair,
            Err(e) => return db_error(e),
        };

        items.push(json!({
            "id": stock.id.to_hex(),
            "symbol": stock.symbol,
            "name": stock.name,
            "exchange": stock.exchange,
            "is_active": stock.is_active,
            "latest_price": latest_price,
            "price_change_24h": price_change_24h,
            "created_at": stock.created_at,
        }));
    }

    Json(json!({ "success": true, "count": items.len(), "data": items })).into_response()
}

// GET /stocks/:id/
pub async fn get_stock(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(stock_id) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    let stock: Stock = match stocks_service::get_stock(&state, stock_id).await {
        Ok(Some(s)) => s,
        Ok(None) => return not_found(),
        Err(e) => return db_error(e),
    };

    let (latest_price, price_change_24h) = match price_summary(&state, stock.id).await {
        Ok(pair) => pair,
        Err(e) => return db_error(e),
    };

    Json(json!({
        "success": true,
        "data": {
            "id": stock.id.to_hex(),
            "symbol": stock.symbol,
            "name": stock.name,
            "exchange": stock.exchange,
            "is_active": stock.is_active,
            "latest_price": latest_price,
            "price_change_24h": price_change_24h,
            "created_at": stock.created_at,
        }
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct PricesQuery {
    pub hours: Option<i64>,
}

// GET /stocks/:id/prices/
pub async fn get_stock_prices(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PricesQuery>,
) -> Response {
    let Ok(stock_id) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    let hours = query.hours.filter(|h| *h > 0).unwrap_or(24);

    let stock = match stocks_service::get_stock(&state, stock_id).await {
        Ok(Some(s)) => s,
        Ok(None) => return not_found(),
        Err(e) => return db_error(e),
    };

    // newest-first; clients reverse for previous-price comparison
    let prices = match stocks_service::list_prices(&state, stock_id, hours).await {
        Ok(v) => v,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = prices.iter().map(price_json).collect();

    Json(json!({
        "success": true,
        "symbol": stock.symbol,
        "period": format!("{hours} hours"),
        "count": items.len(),
        "data": items,
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct IngestPayload {
    pub timestamp: i64,
    pub open_price: f64,
    pub close_price: f64,

    #[serde(default)]
    pub volume: Option<i64>,
}

// POST /stocks/:id/prices/
//
// Operator-facing ingestion; the poller uses the same engine path.
pub async fn post_stock_prices(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<IngestPayload>,
) -> Response {
    let Ok(stock_id) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    let mut errors = serde_json::Map::new();

    if payload.timestamp <= 0 {
        errors.insert("timestamp".into(), json!("Timestamp must be positive."));
    }
    if !payload.close_price.is_finite() || payload.close_price <= 0.0 {
        errors.insert("close_price".into(), json!("Close price must be positive."));
    }
    if !payload.open_price.is_finite() || payload.open_price <= 0.0 {
        errors.insert("open_price".into(), json!("Open price must be positive."));
    }

    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "errors": errors })),
        )
            .into_response();
    }

    match stocks_service::get_stock(&state, stock_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(e) => return db_error(e),
    }

    let sample = NewSample {
        timestamp: payload.timestamp,
        open_price: payload.open_price,
        close_price: payload.close_price,
        volume: payload.volume,
    };

    match state.engine.ingest(stock_id, sample).await {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": price_json(&stored) })),
        )
            .into_response(),
        Err(e @ EngineError::OutOfOrderSample { .. }) => (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}
