use std::collections::HashMap;

use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;

use crate::models::{Alert, AlertCondition, AlertType, Stock, TriggeredAlert};
use crate::AppState;

use super::auth_service::FieldErrors;

fn parse_alert_type(raw: &str, errs: &mut FieldErrors) -> Option<AlertType> {
    match raw {
        "threshold" => Some(AlertType::Threshold),
        "duration" => Some(AlertType::Duration),
        _ => {
            errs.insert(
                "alert_type".into(),
                "Alert type must be 'threshold' or 'duration'.".into(),
            );
            None
        }
    }
}

fn parse_condition(raw: &str, errs: &mut FieldErrors) -> Option<AlertCondition> {
    match raw {
        "above" => Some(AlertCondition::Above),
        "below" => Some(AlertCondition::Below),
        _ => {
            errs.insert("condition".into(), "Condition must be 'above' or 'below'.".into());
            None
        }
    }
}

fn check_threshold_price(price: f64, errs: &mut FieldErrors) {
    if !price.is_finite() || price <= 0.0 {
        errs.insert("target_price".into(), "Target price must be positive.".into());
    }
}

/// `duration_minutes` is required and positive for duration alerts; a
/// value supplied for a threshold alert is dropped, not an error.
fn check_duration(
    alert_type: AlertType,
    duration_minutes: Option<i64>,
    errs: &mut FieldErrors,
) -> Option<i64> {
    match alert_type {
        AlertType::Threshold => None,
        AlertType::Duration => match duration_minutes {
            Some(m) if m > 0 => Some(m),
            Some(_) => {
                errs.insert(
                    "duration_minutes".into(),
                    "Duration must be at least 1 minute.".into(),
                );
                None
            }
            None => {
                errs.insert(
                    "duration_minutes".into(),
                    "Duration minutes is required for duration alerts.".into(),
                );
                None
            }
        },
    }
}

#[derive(Debug)]
pub struct NewAlert {
    // stock id as hex string
    pub stock: String,
    pub alert_type: String,
    pub condition: String,
    pub target_price: f64,
    pub duration_minutes: Option<i64>,
    pub description: Option<String>,
    pub is_active: bool,
}

pub async fn create_alert(
    state: &AppState,
    user_id: ObjectId,
    input: NewAlert,
) -> Result<Alert, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let alert_type = parse_alert_type(&input.alert_type, &mut errs);
    let condition = parse_condition(&input.condition, &mut errs);
    check_threshold_price(input.target_price, &mut errs);

    let duration_minutes = match alert_type {
        Some(t) => check_duration(t, input.duration_minutes, &mut errs),
        None => None,
    };

    let stock_id = match ObjectId::parse_str(input.stock.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errs.insert("stock".into(), "Invalid stock id.".into());
            None
        }
    };

    if !errs.is_empty() {
        return Err(errs);
    }

    // a None here always comes with an entry in errs, so this is unreachable
    let (Some(alert_type), Some(condition), Some(stock_id)) = (alert_type, condition, stock_id)
    else {
        return Err(errs);
    };

    let stocks = state.db.collection::<Stock>("stocks");
    let stock = match stocks
        .find_one(doc! { "_id": stock_id, "is_active": true }, None)
        .await
    {
        Ok(Some(s)) => s,
        Ok(None) => {
            errs.insert("stock".into(), "Stock not found or not active.".into());
            return Err(errs);
        }
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    let now = Utc::now().timestamp();

    let alert = Alert {
        id: ObjectId::new(),
        user_id,
        stock_id,
        symbol: stock.symbol,
        alert_type,
        condition,
        threshold_price: input.target_price,
        duration_minutes,
        description: input.description,
        is_active: input.is_active,
        created_at: now,
        updated_at: now,
    };

    let alerts = state.db.collection::<Alert>("alerts");
    if let Err(e) = alerts.insert_one(&alert, None).await {
        errs.insert("_form".into(), format!("db error: {e}"));
        return Err(errs);
    }

    let _ = state.events_tx.send("alertsUpdated".to_string());

    Ok(alert)
}

pub async fn list_user_alerts(
    state: &AppState,
    user_id: ObjectId,
    is_active: Option<bool>,
    symbol: Option<&str>,
) -> Result<Vec<Alert>, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let mut filter = doc! { "user_id": user_id };
    if let Some(active) = is_active {
        filter.insert("is_active", active);
    }
    if let Some(sym) = symbol {
        filter.insert("symbol", sym.trim().to_uppercase());
    }

    let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

    let mut cursor = alerts
        .find(filter, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<Alert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

pub async fn get_user_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Option<Alert>, String> {
    let alerts = state.db.collection::<Alert>("alerts");
    alerts
        .find_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Default)]
pub struct AlertChanges {
    pub condition: Option<String>,
    pub target_price: Option<f64>,
    pub duration_minutes: Option<i64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update: only the provided fields are written, so a bare
/// `is_active` toggle cannot clobber server-managed fields. Any change
/// clears the alert's duration progress; an edited definition or a
/// re-activated alert starts a fresh streak.
pub async fn update_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
    changes: AlertChanges,
) -> Result<Alert, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let existing = match get_user_alert(state, user_id, alert_id).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            errs.insert("_form".into(), "Alert not found.".into());
            return Err(errs);
        }
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    let mut set = doc! {};

    if let Some(raw) = changes.condition.as_deref() {
        // parse only to validate; the stored form is the lowercase string
        if parse_condition(raw, &mut errs).is_some() {
            set.insert("condition", raw);
        }
    }

    if let Some(price) = changes.target_price {
        check_threshold_price(price, &mut errs);
        set.insert("threshold_price", price);
    }

    if let Some(minutes) = changes.duration_minutes {
        match existing.alert_type {
            AlertType::Duration if minutes > 0 => {
                set.insert("duration_minutes", minutes);
            }
            AlertType::Duration => {
                errs.insert(
                    "duration_minutes".into(),
                    "Duration must be at least 1 minute.".into(),
                );
            }
            // threshold alerts never carry a duration
            AlertType::Threshold => {}
        }
    }

    if let Some(description) = changes.description {
        set.insert("description", description);
    }

    if let Some(active) = changes.is_active {
        set.insert("is_active", active);
    }

    if !errs.is_empty() {
        return Err(errs);
    }

    set.insert("updated_at", Utc::now().timestamp());

    let alerts = state.db.collection::<Alert>("alerts");
    if let Err(e) = alerts
        .update_one(
            doc! { "_id": alert_id, "user_id": user_id },
            doc! { "$set": set },
            None,
        )
        .await
    {
        errs.insert("_form".into(), format!("db error: {e}"));
        return Err(errs);
    }

    state.engine.clear_tracker(existing.stock_id, alert_id).await;

    let _ = state.events_tx.send("alertsUpdated".to_string());

    match get_user_alert(state, user_id, alert_id).await {
        Ok(Some(a)) => Ok(a),
        Ok(None) => {
            errs.insert("_form".into(), "Alert not found.".into());
            Err(errs)
        }
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            Err(errs)
        }
    }
}

/// Returns true if an alert was deleted, false if none matched.
pub async fn delete_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<bool, String> {
    let existing = get_user_alert(state, user_id, alert_id).await?;

    let Some(existing) = existing else {
        return Ok(false);
    };

    let alerts = state.db.collection::<Alert>("alerts");
    alerts
        .delete_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    state.engine.clear_tracker(existing.stock_id, alert_id).await;

    let _ = state.events_tx.send("alertsUpdated".to_string());

    Ok(true)
}

pub async fn list_triggered(
    state: &AppState,
    user_id: ObjectId,
    days: Option<i64>,
) -> Result<Vec<TriggeredAlert>, String> {
    let triggered = state.db.collection::<TriggeredAlert>("triggered_alerts");

    let mut filter = doc! { "user_id": user_id };
    if let Some(days) = days {
        let since = Utc::now().timestamp() - days * 24 * 3600;
        filter.insert("triggered_at", doc! { "$gte": since });
    }

    let find_opts = FindOptions::builder()
        .sort(doc! { "triggered_at": -1 })
        .build();

    let mut cursor = triggered
        .find(filter, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<TriggeredAlert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

#[derive(Debug)]
pub struct AlertStats {
    pub total_alerts: u64,
    pub active_alerts: u64,
    pub inactive_alerts: u64,
    pub total_triggered: u64,
    pub triggered_this_week: u64,
    pub triggered_this_month: u64,
    pub threshold_alerts: u64,
    pub duration_alerts: u64,
}

pub async fn statistics(state: &AppState, user_id: ObjectId) -> Result<AlertStats, String> {
    let alerts = state.db.collection::<Alert>("alerts");
    let triggered = state.db.collection::<TriggeredAlert>("triggered_alerts");

    let now = Utc::now().timestamp();
    let week_ago = now - 7 * 24 * 3600;
    let month_ago = now - 30 * 24 * 3600;

    let total_alerts = alerts
        .count_documents(doc! { "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;
    let active_alerts = alerts
        .count_documents(doc! { "user_id": user_id, "is_active": true }, None)
        .await
        .map_err(|e| e.to_string())?;
    let threshold_alerts = alerts
        .count_documents(doc! { "user_id": user_id, "alert_type": "threshold" }, None)
        .await
        .map_err(|e| e.to_string())?;
    let duration_alerts = alerts
        .count_documents(doc! { "user_id": user_id, "alert_type": "duration" }, None)
        .await
        .map_err(|e| e.to_string())?;

    let total_triggered = triggered
        .count_documents(doc! { "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;
    let triggered_this_week = triggered
        .count_documents(
            doc! { "user_id": user_id, "triggered_at": { "$gte": week_ago } },
            None,
        )
        .await
        .map_err(|e| e.to_string())?;
    let triggered_this_month = triggered
        .count_documents(
            doc! { "user_id": user_id, "triggered_at": { "$gte": month_ago } },
            None,
        )
        .await
        .map_err(|e| e.to_string())?;

    Ok(AlertStats {
        total_alerts,
        active_alerts,
        inactive_alerts: total_alerts - active_alerts,
        total_triggered,
        triggered_this_week,
        triggered_this_month,
        threshold_alerts,
        duration_alerts,
    })
}
