use std::collections::HashMap;

use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::{doc, oid::ObjectId};

use crate::{AppState, auth::Claims, models::User};

pub type FieldErrors = HashMap<String, String>;

pub fn make_access_token(state: &AppState, user_id: &ObjectId) -> Result<String, String> {
    make_token(
        state,
        user_id,
        "access",
        Duration::minutes(state.settings.access_token_minutes),
    )
}

pub fn make_refresh_token(state: &AppState, user_id: &ObjectId) -> Result<String, String> {
    make_token(
        state,
        user_id,
        "refresh",
        Duration::days(state.settings.refresh_token_days),
    )
}

fn make_token(
    state: &AppState,
    user_id: &ObjectId,
    token_type: &str,
    ttl: Duration,
) -> Result<String, String> {
    let exp = (Utc::now() + ttl).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_hex(),
        exp,
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

/// Exchanges a valid refresh token for a fresh access token. Access tokens
/// are rejected here: only a `token_type = "refresh"` claim may mint.
pub async fn refresh_access_token(state: &AppState, refresh_token: &str) -> Result<String, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(
        refresh_token,
        &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| e.to_string())?;

    if data.claims.token_type != "refresh" {
        return Err("not a refresh token".to_string());
    }

    let user_id = ObjectId::parse_str(&data.claims.sub).map_err(|e| e.to_string())?;

    // the account must still exist
    let users = state.db.collection::<User>("users");
    let user = users
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    if user.is_none() {
        return Err("unknown user".to_string());
    }

    make_access_token(state, &user_id)
}

pub async fn login_user(state: &AppState, email: &str, password: &str) -> Result<User, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let users = state.db.collection::<User>("users");

    let user = match users.find_one(doc! { "email": email }, None).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            errs.insert("_form".into(), "Invalid email or password.".into());
            return Err(errs);
        }
        Err(_) => {
            errs.insert("_form".into(), "Server error. Please try again.".into());
            return Err(errs);
        }
    };

    if !verify(password, &user.password_hash).unwrap_or(false) {
        errs.insert("_form".into(), "Invalid email or password.".into());
        return Err(errs);
    }

    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
    phone_number: Option<String>,
) -> Result<User, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let users = state.db.collection::<User>("users");

    // unique email
    match users.find_one(doc! { "email": email }, None).await {
        Ok(Some(_)) => {
            errs.insert("email".into(), "Email has already been taken!".into());
            return Err(errs);
        }
        Ok(None) => {}
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user!".into());
            return Err(errs);
        }
    }

    // unique username
    match users.find_one(doc! { "username": username }, None).await {
        Ok(Some(_)) => {
            errs.insert("username".into(), "Username has already been taken!".into());
            return Err(errs);
        }
        Ok(None) => {}
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user!".into());
            return Err(errs);
        }
    }

    let pw_hash = match hash(password, DEFAULT_COST) {
        Ok(h) => h,
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user!".into());
            return Err(errs);
        }
    };

    let user = User {
        id: ObjectId::new(),
        email: email.to_string(),
        username: username.to_string(),
        password_hash: pw_hash,
        phone_number,
        email_notifications: true,
        created_at: Utc::now().timestamp(),
    };

    if users.insert_one(&user, None).await.is_err() {
        errs.insert("_form".into(), "There is a problem registering this user!".into());
        return Err(errs);
    }

    Ok(user)
}

#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub email_notifications: Option<bool>,
}

/// Partial update: only the provided fields are written.
pub async fn update_profile(
    state: &AppState,
    user_id: ObjectId,
    changes: ProfileChanges,
) -> Result<User, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let users = state.db.collection::<User>("users");

    let mut set = doc! {};

    if let Some(username) = changes.username {
        // unique among other users
        match users
            .find_one(doc! { "username": &username, "_id": { "$ne": user_id } }, None)
            .await
        {
            Ok(Some(_)) => {
                errs.insert("username".into(), "Username has already been taken!".into());
                return Err(errs);
            }
            Ok(None) => {}
            Err(e) => {
                errs.insert("_form".into(), format!("db error: {e}"));
                return Err(errs);
            }
        }
        set.insert("username", username);
    }

    if let Some(phone_number) = changes.phone_number {
        set.insert("phone_number", phone_number);
    }

    if let Some(email_notifications) = changes.email_notifications {
        set.insert("email_notifications", email_notifications);
    }

    if !set.is_empty() {
        if let Err(e) = users
            .update_one(doc! { "_id": user_id }, doc! { "$set": set }, None)
            .await
        {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    }

    match users.find_one(doc! { "_id": user_id }, None).await {
        Ok(Some(u)) => Ok(u),
        Ok(None) => {
            errs.insert("_form".into(), "User not found.".into());
            Err(errs)
        }
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            Err(errs)
        }
    }
}
