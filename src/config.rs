use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,

    pub market_api_url: String,
    pub market_api_key: String,
    pub price_poll_secs: u64,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri =
        env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB").unwrap_or_else(|_| "stockalert".to_string());

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());

    let access_token_minutes = env::var("ACCESS_TOKEN_MINUTES")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(60);

    let refresh_token_days = env::var("REFRESH_TOKEN_DAYS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(7);

    let market_api_url = env::var("MARKET_API_URL")
        .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string());

    let market_api_key = env::var("MARKET_API_KEY").unwrap_or_default();

    let price_poll_secs = env::var("PRICE_POLL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(300);

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        access_token_minutes,
        refresh_token_days,
        market_api_url,
        market_api_key,
        price_poll_secs,
    }
}
