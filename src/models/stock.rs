use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // uppercase, unique
    pub symbol: String,
    pub name: String,

    #[serde(default)]
    pub exchange: String,

    pub is_active: bool,
    pub created_at: i64,
}
