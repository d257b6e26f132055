use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,
    pub username: String,
    pub password_hash: String,

    #[serde(default)]
    pub phone_number: Option<String>,

    #[serde(default = "default_true")]
    pub email_notifications: bool,

    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

/// What request handlers see after the auth middleware has resolved the
/// bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
    pub username: String,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
        }
    }
}
