use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, controllers::auth_controller};

// Django-style trailing slashes: the SPA calls these paths verbatim.
pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/auth/register/", post(auth_controller::post_register))
        .route("/auth/login/", post(auth_controller::post_login))
        .route("/auth/token/refresh/", post(auth_controller::post_refresh))
        .route(
            "/auth/profile/",
            get(auth_controller::get_profile).put(auth_controller::put_profile),
        )
}
