use anyhow::Result;
use axum::{extract::State, routing::get, Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::{LiveRecord, SharedAggregate};

pub fn router(shared: SharedAggregate) -> Router {
    Router::new()
        .route("/records", get(list_records))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn list_records(State(shared): State<SharedAggregate>) -> Json<Vec<LiveRecord>> {
    Json(shared.records().await)
}

pub async fn serve(addr: &str, shared: SharedAggregate) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let cells = shared.len().await;
    info!("serving {} cells on http://{}", cells, listener.local_addr()?);
    axum::serve(listener, router(shared)).await?;
    Ok(())
}
