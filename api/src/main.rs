use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect};
use serde_json::{json, Value};
use shared::entity::candles;
use shared::{get_db_connection, Config};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// The chart only ever renders the most recent window of history.
const CANDLE_QUERY_LIMIT: u64 = 500;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting TradeSpot market API server...");

    let config = Config::from_env()?;
    let db = get_db_connection(&config.database_url).await?;
    info!("Connected to database");

    let app = Router::new()
        .route("/api/market/candles", get(recent_candles))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(db);

    let listener = tokio::net::TcpListener::bind(&config.api_bind).await?;
    info!("Market API listening on http://{}", config.api_bind);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Up to the 500 most recent candles, oldest first.
async fn recent_candles(
    State(db): State<DatabaseConnection>,
) -> Result<Json<Vec<candles::Model>>, StatusCode> {
    let mut rows = candles::Entity::find()
        .order_by_desc(candles::Column::Time)
        .limit(CANDLE_QUERY_LIMIT)
        .all(&db)
        .await
        .map_err(|err| {
            error!("Failed to query candles: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    // Newest-first query, reversed to chronological order for charting.
    rows.reverse();
    Ok(Json(rows))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
