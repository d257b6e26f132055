//! Library entrypoint for the stock price alerting service.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services
//! and the evaluation engine).

pub mod config;
pub mod models;

// Kept at crate root because the codebase references it as `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod engine;
pub mod services;

pub mod controllers;
pub mod events;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub market: services::market_data::MarketDataClient,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
    pub engine: engine::EngineHandle,
}
