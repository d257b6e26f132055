use axum::{Router, routing::get};

use crate::{AppState, controllers::stocks_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/stocks/", get(stocks_controller::get_stocks))
        .route("/stocks/:id/", get(stocks_controller::get_stock))
        .route(
            "/stocks/:id/prices/",
            get(stocks_controller::get_stock_prices).post(stocks_controller::post_stock_prices),
        )
}
