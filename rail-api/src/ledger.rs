use axum::{extract::State, routing::get, Json, Router};
use rail_core::{InvariantBreach, LedgerStats};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct AuditResponse {
    healthy: bool,
    breaches: Vec<InvariantBreach>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/ledger/stats", get(stats))
        .route("/v1/ledger/audit", get(audit))
}

async fn stats(State(state): State<AppState>) -> Result<Json<LedgerStats>, AppError> {
    Ok(Json(state.ledger.stats().await?))
}

async fn audit(State(state): State<AppState>) -> Result<Json<AuditResponse>, AppError> {
    let breaches = state.ledger.audit().await?;
    Ok(Json(AuditResponse {
        healthy: breaches.is_empty(),
        breaches,
    }))
}
