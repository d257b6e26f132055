use mongodb::{
    Database, IndexModel,
    bson::doc,
    options::IndexOptions,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // users: unique email and username
    {
        let col = db.collection::<mongodb::bson::Document>("users");

        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(email, None)
            .await
            .map_err(|e| e.to_string())?;

        let username = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(username, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // stocks: unique symbol
    {
        let col = db.collection::<mongodb::bson::Document>("stocks");
        let model = IndexModel::builder()
            .keys(doc! { "symbol": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // prices: append-only per stock; the unique pair backs the ingestor's
    // monotonicity check and the sort serves newest-first reads
    {
        let col = db.collection::<mongodb::bson::Document>("prices");
        let model = IndexModel::builder()
            .keys(doc! { "stock_id": 1, "timestamp": -1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alerts: list per user sorted by created_at, and the engine's scan
    // of active alerts per stock
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");

        let by_user = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();
        let _ = col.create_index(by_user, None).await;

        let by_stock = IndexModel::builder()
            .keys(doc! { "is_active": 1, "stock_id": 1 })
            .build();
        let _ = col.create_index(by_stock, None).await;
    }

    // triggered alerts: list per user, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("triggered_alerts");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "triggered_at": -1 })
            .build();

        let _ = col.create_index(model, None).await;
    }

    Ok(())
}
