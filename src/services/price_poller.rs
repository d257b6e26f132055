use std::time::Duration;

use tokio::time;

use crate::engine::{EngineError, NewSample};
use crate::AppState;

use super::stocks_service;

/// Periodically fetches a quote for every active stock and feeds it to
/// the evaluation engine. Out-of-order samples (the upstream quote
/// timestamp has not advanced since the last tick) are logged and
/// dropped; they never reach alert evaluation.
pub fn spawn_price_poller(state: AppState) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(state.settings.price_poll_secs));

        loop {
            interval.tick().await;

            if let Err(e) = run_tick(&state).await {
                tracing::error!("[price-poller] tick error: {}", e);
            }
        }
    });
}

async fn run_tick(state: &AppState) -> Result<(), String> {
    let stocks = stocks_service::list_stocks(state, None).await?;

    if stocks.is_empty() {
        return Ok(());
    }

    let mut ingested_any = false;

    // at most one quote request per symbol per tick
    for stock in stocks {
        let quote = match state.market.quote(&stock.symbol).await {
            Ok(q) => q,
            Err(_) => continue, // skip the symbol if the API fails this tick
        };

        let price = quote.c;
        if !price.is_finite() || price <= 0.0 {
            continue;
        }

        let sample = NewSample {
            timestamp: quote.t,
            open_price: quote.o,
            close_price: price,
            volume: None,
        };

        match state.engine.ingest(stock.id, sample).await {
            Ok(_) => ingested_any = true,
            Err(e @ EngineError::OutOfOrderSample { .. }) => {
                tracing::warn!("[price-poller] {}: {}", stock.symbol, e);
            }
            Err(e) => {
                tracing::error!("[price-poller] {}: {}", stock.symbol, e);
            }
        }
    }

    if ingested_any {
        let _ = state.events_tx.send("pricesUpdated".to_string());
    }

    Ok(())
}
