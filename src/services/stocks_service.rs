use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;

use crate::models::{PriceSample, Stock};
use crate::AppState;

pub async fn list_stocks(state: &AppState, symbol: Option<&str>) -> Result<Vec<Stock>, String> {
    let stocks = state.db.collection::<Stock>("stocks");

    let mut filter = doc! { "is_active": true };
    if let Some(sym) = symbol {
        let sym = sym.trim();
        if !sym.is_empty() {
            filter.insert(
                "symbol",
                doc! { "$regex": regex::escape(sym), "$options": "i" },
            );
        }
    }

    let find_opts = FindOptions::builder().sort(doc! { "symbol": 1 }).build();

    let mut cursor = stocks
        .find(filter, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<Stock> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

pub async fn get_stock(state: &AppState, stock_id: ObjectId) -> Result<Option<Stock>, String> {
    let stocks = state.db.collection::<Stock>("stocks");
    stocks
        .find_one(doc! { "_id": stock_id }, None)
        .await
        .map_err(|e| e.to_string())
}

/// Newest-first. The two latest samples are enough for a latest price and
/// its change against the previous observation.
pub async fn latest_samples(
    state: &AppState,
    stock_id: ObjectId,
    limit: i64,
) -> Result<Vec<PriceSample>, String> {
    let prices = state.db.collection::<PriceSample>("prices");

    let find_opts = FindOptions::builder()
        .sort(doc! { "timestamp": -1 })
        .limit(limit)
        .build();

    let mut cursor = prices
        .find(doc! { "stock_id": stock_id }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<PriceSample> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

/// Samples within the trailing window, newest-first (consumers reverse
/// for oldest-first charts).
pub async fn list_prices(
    state: &AppState,
    stock_id: ObjectId,
    hours: i64,
) -> Result<Vec<PriceSample>, String> {
    let prices = state.db.collection::<PriceSample>("prices");

    let since = Utc::now().timestamp() - hours * 3600;
    let find_opts = FindOptions::builder().sort(doc! { "timestamp": -1 }).build();

    let mut cursor = prices
        .find(
            doc! { "stock_id": stock_id, "timestamp": { "$gte": since } },
            find_opts,
        )
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<PriceSample> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}
