use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::alert::{AlertCondition, AlertType};

/// Immutable record of one trigger event. Snapshots the alert definition
/// at the moment of firing, so later edits or deletion of the alert do not
/// rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredAlert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub alert_id: ObjectId,
    pub user_id: ObjectId,
    pub stock_id: ObjectId,
    pub symbol: String,

    pub alert_type: AlertType,
    pub condition: AlertCondition,
    pub threshold_price: f64,

    pub trigger_price: f64,

    // timestamp of the sample that fired the alert
    pub sample_ts: i64,
    pub triggered_at: i64,
}
