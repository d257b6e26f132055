use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::doc;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    models::{CurrentUser, User},
    services::auth_service,
};

fn is_valid_email(email: &str) -> bool {
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    re.is_match(email)
}

fn user_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id.to_hex(),
        "username": user.username,
        "email": user.email,
        "phone_number": user.phone_number,
        "email_notifications": user.email_notifications,
        "created_at": user.created_at,
    })
}

fn validation_failed(errors: serde_json::Map<String, serde_json::Value>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "errors": errors })),
    )
        .into_response()
}

fn server_error(msg: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": msg })),
    )
        .into_response()
}

fn token_pair(state: &AppState, user: &User) -> Result<(String, String), String> {
    let access = auth_service::make_access_token(state, &user.id)?;
    let refresh = auth_service::make_refresh_token(state, &user.id)?;
    Ok((access, refresh))
}

// ---------------- Register ----------------

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,

    #[serde(default)]
    pub phone_number: Option<String>,
}

pub async fn post_register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();
    let password = payload.password.trim().to_string();

    let mut errors = serde_json::Map::new();

    if username.is_empty() {
        errors.insert("username".into(), json!("Username is required."));
    } else if username.len() < 2 {
        errors.insert("username".into(), json!("Username must be at least 2 characters."));
    }

    if email.is_empty() {
        errors.insert("email".into(), json!("Email is required."));
    } else if !is_valid_email(&email) {
        errors.insert("email".into(), json!("Invalid email."));
    }

    if password.is_empty() {
        errors.insert("password".into(), json!("Password is required."));
    } else if password.len() < 6 {
        errors.insert("password".into(), json!("Password must be at least 6 characters."));
    }

    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let user = match auth_service::register_user(
        &state,
        &username,
        &email,
        &password,
        payload.phone_number,
    )
    .await
    {
        Ok(u) => u,
        Err(errs) => {
            for (k, v) in errs {
                errors.insert(k, json!(v));
            }
            return validation_failed(errors);
        }
    };

    let (access, refresh) = match token_pair(&state, &user) {
        Ok(pair) => pair,
        Err(e) => return server_error(format!("Auth error: {e}")),
    };

    tracing::info!("new user registered: {}", user.username);

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": {
                "user": user_json(&user),
                "access": access,
                "refresh": refresh,
            }
        })),
    )
        .into_response()
}

// ---------------- Login ----------------

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn post_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let email = payload.email.trim().to_string();
    let password = payload.password.trim().to_string();

    let mut errors = serde_json::Map::new();

    if email.is_empty() {
        errors.insert("email".into(), json!("Email is required."));
    } else if !is_valid_email(&email) {
        errors.insert("email".into(), json!("Invalid email."));
    }

    if password.is_empty() {
        errors.insert("password".into(), json!("Password is required."));
    }

    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let user = match auth_service::login_user(&state, &email, &password).await {
        Ok(u) => u,
        Err(errs) => {
            for (k, v) in errs {
                errors.insert(k, json!(v));
            }
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": "Login failed", "errors": errors })),
            )
                .into_response();
        }
    };

    let (access, refresh) = match token_pair(&state, &user) {
        Ok(pair) => pair,
        Err(e) => return server_error(format!("Auth error: {e}")),
    };

    tracing::info!("user logged in: {}", user.username);

    Json(json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "user": user_json(&user),
            "access": access,
            "refresh": refresh,
        }
    }))
    .into_response()
}

// ---------------- Token refresh ----------------

#[derive(Deserialize)]
pub struct RefreshPayload {
    pub refresh: String,
}

pub async fn post_refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Response {
    match auth_service::refresh_access_token(&state, payload.refresh.trim()).await {
        Ok(access) => Json(json!({ "success": true, "access": access })).into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Invalid or expired refresh token" })),
        )
            .into_response(),
    }
}

// ---------------- Profile ----------------

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(u): Extension<CurrentUser>,
) -> Response {
    let users = state.db.collection::<User>("users");

    match users.find_one(doc! { "_id": u.id }, None).await {
        Ok(Some(user)) => {
            Json(json!({ "success": true, "data": user_json(&user) })).into_response()
        }
        Ok(None) => server_error("User not found".to_string()),
        Err(e) => server_error(format!("db error: {e}")),
    }
}

#[derive(Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email_notifications: Option<bool>,
}

pub async fn put_profile(
    State(state): State<AppState>,
    Extension(u): Extension<CurrentUser>,
    Json(payload): Json<ProfilePayload>,
) -> Response {
    let mut errors = serde_json::Map::new();

    let username = payload.username.map(|s| s.trim().to_string());
    if let Some(name) = username.as_deref() {
        if name.len() < 2 {
            errors.insert("username".into(), json!("Username must be at least 2 characters."));
        }
    }

    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let changes = auth_service::ProfileChanges {
        username,
        phone_number: payload.phone_number,
        email_notifications: payload.email_notifications,
    };

    match auth_service::update_profile(&state, u.id, changes).await {
        Ok(user) => Json(json!({
            "success": true,
            "message": "Profile updated successfully",
            "data": user_json(&user),
        }))
        .into_response(),
        Err(errs) => {
            for (k, v) in errs {
                errors.insert(k, json!(v));
            }
            validation_failed(errors)
        }
    }
}
