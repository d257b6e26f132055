pub mod alerts_service;
pub mod auth_service;
pub mod db_init;
pub mod market_data;
pub mod price_poller;
pub mod stocks_service;
