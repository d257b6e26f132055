use axum::{
    Json,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState,
    models::{CurrentUser, User},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id as hex string
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
    // "access" | "refresh"
    pub token_type: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

pub fn decode_claims(state: &AppState, token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims)
}

/// Resolves the bearer token (access tokens only) and stores the user in
/// request extensions so handlers can take `Extension<CurrentUser>`.
pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        if let Some(claims) = decode_claims(&state, &token) {
            if claims.token_type == "access" {
                if let Ok(user_id) = ObjectId::parse_str(&claims.sub) {
                    let users = state.db.collection::<User>("users");

                    if let Ok(Some(user)) = users.find_one(doc! { "_id": user_id }, None).await {
                        req.extensions_mut().insert(CurrentUser::from(user));
                    }
                }
            }
        }
    }

    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    path == "/auth/register/"
        || path == "/auth/login/"
        || path == "/auth/token/refresh/"
        || path == "/health"
        || path == "/health/db"
}

/// Everything except register/login/refresh and health requires a valid
/// access token. A 401 is the client's cue to attempt one refresh.
pub async fn require_auth(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "Authentication required" })),
    )
        .into_response()
}
