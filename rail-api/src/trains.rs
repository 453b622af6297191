use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use rail_core::{LedgerError, Train, TrainId};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{passenger_auth_middleware, PassengerClaims};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTrainRequest {
    pub name: String,
    /// Kept as a raw JSON number so oversized or fractional values are
    /// reported as invalid arguments rather than body rejections.
    pub capacity: Number,
}

impl CreateTrainRequest {
    pub fn capacity(&self) -> Result<i64, LedgerError> {
        if let Some(capacity) = self.capacity.as_i64() {
            return Ok(capacity);
        }

        match self.capacity.as_f64() {
            Some(value) if value.fract() != 0.0 => {
                Err(LedgerError::InvalidArgument(format!("capacity {} is not a whole number", self.capacity)))
            }
            Some(value) if value >= i64::MIN as f64 && value < i64::MAX as f64 => Ok(value as i64),
            _ => Err(LedgerError::InvalidArgument(format!("capacity {} exceeds the seat range", self.capacity))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub train_id: TrainId,
    pub name: String,
    pub capacity: u32,
    pub available_seats: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Train> for TrainResponse {
    fn from(train: Train) -> Self {
        Self {
            train_id: train.id,
            name: train.name,
            capacity: train.capacity,
            available_seats: train.available_seats,
            created_at: train.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatAvailabilityResponse {
    pub train_id: TrainId,
    pub available_seats: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookTicketResponse {
    pub booking_id: u64,
    pub train_id: TrainId,
    pub seat_number: u32,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/trains/{id}/bookings", post(book_ticket))
        .route_layer(middleware::from_fn_with_state(state, passenger_auth_middleware));

    Router::new()
        .route("/v1/trains", post(create_train).get(list_trains))
        .route("/v1/trains/{id}", get(get_train))
        .route("/v1/trains/{id}/seats", get(get_available_seats))
        .merge(protected)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trains
async fn create_train(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTrainRequest>,
) -> Result<(StatusCode, Json<TrainResponse>), AppError> {
    let train = state.ledger.create_train(&req.name, req.capacity()?).await?;
    Ok((StatusCode::CREATED, Json(train.into())))
}

/// GET /v1/trains
async fn list_trains(State(state): State<AppState>) -> Result<Json<Vec<TrainResponse>>, AppError> {
    let trains = state.ledger.list_trains().await?;
    Ok(Json(trains.into_iter().map(TrainResponse::from).collect()))
}

/// GET /v1/trains/{id}
async fn get_train(
    State(state): State<AppState>,
    ApiPath(train_id): ApiPath<TrainId>,
) -> Result<Json<TrainResponse>, AppError> {
    let train = state.ledger.get_train(train_id).await?;
    Ok(Json(train.into()))
}

/// GET /v1/trains/{id}/seats
async fn get_available_seats(
    State(state): State<AppState>,
    ApiPath(train_id): ApiPath<TrainId>,
) -> Result<Json<SeatAvailabilityResponse>, AppError> {
    let available_seats = state.ledger.get_available_seats(train_id).await?;
    Ok(Json(SeatAvailabilityResponse { train_id, available_seats }))
}

/// POST /v1/trains/{id}/bookings
/// Book one seat for the authenticated passenger
async fn book_ticket(
    State(state): State<AppState>,
    ApiPath(train_id): ApiPath<TrainId>,
    Extension(claims): Extension<PassengerClaims>,
) -> Result<(StatusCode, Json<BookTicketResponse>), AppError> {
    let booking = state.ledger.book_ticket(train_id, &claims.sub).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookTicketResponse {
            booking_id: booking.id,
            train_id: booking.train_id,
            seat_number: booking.seat_number,
        }),
    ))
}
