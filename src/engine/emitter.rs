use chrono::Utc;
use mongodb::Database;
use mongodb::bson::{doc, oid::ObjectId};
use tokio::sync::broadcast;

use crate::models::{Alert, PriceSample, TriggeredAlert};

/// Converts a satisfied condition into a triggered-alert record and
/// deactivates the source alert.
///
/// The conditional update on `is_active: true` is the at-most-once gate:
/// returns `Ok(false)` when the alert was already fired or deactivated, so
/// replaying the same trigger event never writes a second record. If the
/// record insert fails, the claim is rolled back before the error is
/// returned: an alert must not stay deactivated without its record.
pub async fn fire(
    db: &Database,
    events_tx: &broadcast::Sender<String>,
    alert: &Alert,
    sample: &PriceSample,
) -> Result<bool, String> {
    let alerts = db.collection::<Alert>("alerts");
    let now = Utc::now().timestamp();

    let claim = alerts
        .update_one(
            doc! { "_id": alert.id, "is_active": true },
            doc! { "$set": { "is_active": false, "updated_at": now } },
            None,
        )
        .await
        .map_err(|e| e.to_string())?;

    if claim.modified_count == 0 {
        return Ok(false);
    }

    let record = TriggeredAlert {
        id: ObjectId::new(),
        alert_id: alert.id,
        user_id: alert.user_id,
        stock_id: alert.stock_id,
        symbol: alert.symbol.clone(),
        alert_type: alert.alert_type,
        condition: alert.condition,
        threshold_price: alert.threshold_price,
        trigger_price: sample.close_price,
        sample_ts: sample.timestamp,
        triggered_at: now,
    };

    let triggered = db.collection::<TriggeredAlert>("triggered_alerts");
    if let Err(e) = triggered.insert_one(&record, None).await {
        let _ = alerts
            .update_one(
                doc! { "_id": alert.id },
                doc! { "$set": { "is_active": true, "updated_at": now } },
                None,
            )
            .await;
        return Err(e.to_string());
    }

    let _ = events_tx.send("alertsUpdated".to_string());

    Ok(true)
}
