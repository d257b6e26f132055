use mongodb::bson::oid::ObjectId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(
        "out-of-order sample for stock {stock_id}: {timestamp} is not after {last_timestamp}"
    )]
    OutOfOrderSample {
        stock_id: ObjectId,
        timestamp: i64,
        last_timestamp: i64,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error("evaluation worker for stock {0} is gone")]
    WorkerGone(ObjectId),
}
