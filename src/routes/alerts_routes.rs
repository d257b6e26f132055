use axum::{
    Router,
    routing::{get, put},
};

use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/alerts/",
            get(alerts_controller::get_alerts).post(alerts_controller::post_alert),
        )
        .route("/alerts/triggered/", get(alerts_controller::get_triggered))
        .route("/alerts/statistics/", get(alerts_controller::get_statistics))
        .route(
            "/alerts/:id/",
            put(alerts_controller::put_alert).delete(alerts_controller::delete_alert),
        )
}
