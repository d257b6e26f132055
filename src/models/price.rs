use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// One price observation for a stock. Append-only: the ingestor rejects
/// any timestamp that is not strictly greater than the stock's newest
/// stored sample, and nothing ever mutates or deletes rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub stock_id: ObjectId,

    // unix seconds
    pub timestamp: i64,

    pub open_price: f64,
    pub close_price: f64,

    #[serde(default)]
    pub volume: Option<i64>,
}
