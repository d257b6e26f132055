//! Alert evaluation engine.
//!
//! One worker task per stock: every sample and tracker message for that
//! stock flows through the worker's channel, which serializes them in
//! arrival order. Duration-tracker state lives inside the worker, so each
//! alert has a single writer. Different stocks evaluate in parallel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::StreamExt;
use mongodb::Database;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOneOptions;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};

use crate::models::{Alert, AlertType, PriceSample};

pub mod emitter;
pub mod evaluator;
pub mod tracker;

mod error;
pub use error::EngineError;

use evaluator::Outcome;
use tracker::TrackerState;

/// A price observation as handed to the ingestor, before it is stored.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub timestamp: i64,
    pub open_price: f64,
    pub close_price: f64,
    pub volume: Option<i64>,
}

enum WorkerMsg {
    Sample {
        sample: NewSample,
        reply: oneshot::Sender<Result<PriceSample, EngineError>>,
    },
    ClearTracker {
        alert_id: ObjectId,
    },
}

#[derive(Clone)]
pub struct EngineHandle {
    db: Database,
    events_tx: broadcast::Sender<String>,
    workers: Arc<Mutex<HashMap<ObjectId, mpsc::Sender<WorkerMsg>>>>,
}

impl EngineHandle {
    pub fn new(db: Database, events_tx: broadcast::Sender<String>) -> Self {
        Self {
            db,
            events_tx,
            workers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Appends a sample for the stock and evaluates its active alerts.
    ///
    /// Fails with [`EngineError::OutOfOrderSample`] when the timestamp is
    /// not strictly greater than the stock's newest stored sample; the
    /// sample is discarded and no tracker state is touched.
    pub async fn ingest(
        &self,
        stock_id: ObjectId,
        sample: NewSample,
    ) -> Result<PriceSample, EngineError> {
        let tx = self.worker(stock_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        tx.send(WorkerMsg::Sample {
            sample,
            reply: reply_tx,
        })
        .await
        .map_err(|_| EngineError::WorkerGone(stock_id))?;

        reply_rx.await.map_err(|_| EngineError::WorkerGone(stock_id))?
    }

    /// Forgets any duration progress for the alert. Sent when an alert is
    /// re-activated, edited or deleted; the next satisfying sample starts
    /// a fresh streak from `Idle`.
    pub async fn clear_tracker(&self, stock_id: ObjectId, alert_id: ObjectId) {
        let tx = self.worker(stock_id).await;
        let _ = tx.send(WorkerMsg::ClearTracker { alert_id }).await;
    }

    async fn worker(&self, stock_id: ObjectId) -> mpsc::Sender<WorkerMsg> {
        let mut workers = self.workers.lock().await;

        if let Some(tx) = workers.get(&stock_id) {
            return tx.clone();
        }

        let (tx, rx) = mpsc::channel(64);
        let worker = StockWorker {
            db: self.db.clone(),
            events_tx: self.events_tx.clone(),
            stock_id,
            last_ts: None,
            trackers: HashMap::new(),
        };
        tokio::spawn(worker.run(rx));

        workers.insert(stock_id, tx.clone());
        tx
    }
}

struct StockWorker {
    db: Database,
    events_tx: broadcast::Sender<String>,
    stock_id: ObjectId,

    // newest stored timestamp for this stock; loaded lazily, then cached
    last_ts: Option<i64>,

    trackers: HashMap<ObjectId, TrackerState>,
}

impl StockWorker {
    async fn run(mut self, mut rx: mpsc::Receiver<WorkerMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                WorkerMsg::Sample { sample, reply } => {
                    let res = self.append(sample).await;
                    let stored = res.as_ref().ok().cloned();

                    let _ = reply.send(res);

                    if let Some(sample) = stored {
                        self.evaluate_alerts(&sample).await;
                    }
                }
                WorkerMsg::ClearTracker { alert_id } => {
                    self.trackers.remove(&alert_id);
                }
            }
        }
    }

    async fn append(&mut self, sample: NewSample) -> Result<PriceSample, EngineError> {
        let last = match self.last_ts {
            Some(ts) => Some(ts),
            None => self.load_last_ts().await?,
        };

        if let Some(last) = last {
            if sample.timestamp <= last {
                return Err(EngineError::OutOfOrderSample {
                    stock_id: self.stock_id,
                    timestamp: sample.timestamp,
                    last_timestamp: last,
                });
            }
        }

        let stored = PriceSample {
            id: ObjectId::new(),
            stock_id: self.stock_id,
            timestamp: sample.timestamp,
            open_price: sample.open_price,
            close_price: sample.close_price,
            volume: sample.volume,
        };

        let prices = self.db.collection::<PriceSample>("prices");
        prices
            .insert_one(&stored, None)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        self.last_ts = Some(stored.timestamp);

        Ok(stored)
    }

    async fn load_last_ts(&self) -> Result<Option<i64>, EngineError> {
        let prices = self.db.collection::<PriceSample>("prices");
        let opts = FindOneOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .build();

        let latest = prices
            .find_one(doc! { "stock_id": self.stock_id }, opts)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;

        Ok(latest.map(|p| p.timestamp))
    }

    async fn evaluate_alerts(&mut self, sample: &PriceSample) {
        let alerts = self.db.collection::<Alert>("alerts");

        let mut cursor = match alerts
            .find(doc! { "stock_id": self.stock_id, "is_active": true }, None)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("alert scan failed for stock {}: {}", self.stock_id, e);
                return;
            }
        };

        let mut active: Vec<Alert> = Vec::new();
        while let Some(item) = cursor.next().await {
            match item {
                Ok(a) => active.push(a),
                Err(e) => {
                    // fail closed: leave every tracker as it was
                    tracing::error!("alert scan failed for stock {}: {}", self.stock_id, e);
                    return;
                }
            }
        }

        // forget progress for alerts that are gone or no longer active
        let live: HashSet<ObjectId> = active.iter().map(|a| a.id).collect();
        self.trackers.retain(|id, _| live.contains(id));

        for alert in &active {
            self.evaluate_one(alert, sample).await;
        }
    }

    async fn evaluate_one(&mut self, alert: &Alert, sample: &PriceSample) {
        let outcome = evaluator::evaluate(alert.condition, alert.threshold_price, sample.close_price);

        let (fire, prior) = match alert.alert_type {
            AlertType::Threshold => (outcome == Outcome::Satisfied, None),
            AlertType::Duration => {
                let Some(minutes) = alert.duration_minutes else {
                    tracing::warn!("duration alert {} has no duration_minutes, skipping", alert.id);
                    return;
                };

                let state = *self.trackers.get(&alert.id).unwrap_or(&TrackerState::Idle);
                let step = tracker::step(state, outcome, sample.timestamp, minutes);

                self.trackers.insert(alert.id, step.state);
                (step.fire, Some(state))
            }
        };

        if !fire {
            return;
        }

        match emitter::fire(&self.db, &self.events_tx, alert, sample).await {
            Ok(true) => {
                self.trackers.remove(&alert.id);
                tracing::info!(
                    "alert {} fired for {} at {}",
                    alert.id,
                    alert.symbol,
                    sample.close_price
                );
            }
            Ok(false) => {
                self.trackers.remove(&alert.id);
            }
            Err(e) => {
                // fail closed: restore the pre-step state; the fire is
                // retried on the next satisfying sample
                if let Some(prior) = prior {
                    self.trackers.insert(alert.id, prior);
                }
                tracing::error!("failed to fire alert {}: {}", alert.id, e);
            }
        }
    }
}
