use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Fires on a single sample crossing the threshold.
    Threshold,
    /// Fires only after the condition has held continuously for
    /// `duration_minutes`.
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub stock_id: ObjectId,

    // denormalized from the stock for cheap display and filtering
    pub symbol: String,

    pub alert_type: AlertType,
    pub condition: AlertCondition,
    pub threshold_price: f64,

    // present iff alert_type == Duration, always > 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
