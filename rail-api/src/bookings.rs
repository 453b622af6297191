use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Json, Router,
};
use rail_core::{Booking, BookingId, TrainId};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::ApiPath;
use crate::middleware::{passenger_auth_middleware, PassengerClaims};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking_id: BookingId,
    pub passenger: String,
    pub train_id: TrainId,
    pub seat_number: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PassengerBookingResponse {
    pub booking_id: BookingId,
    pub train_id: TrainId,
    pub seat_number: u32,
    pub booked_at: chrono::DateTime<chrono::Utc>,
}

impl From<Booking> for PassengerBookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            train_id: booking.train_id,
            seat_number: booking.seat_number,
            booked_at: booking.booked_at,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/bookings", get(list_my_bookings))
        .route_layer(middleware::from_fn_with_state(state, passenger_auth_middleware));

    Router::new()
        .route("/v1/bookings/{id}", get(get_booking_details))
        .merge(protected)
}

/// GET /v1/bookings/{id}
async fn get_booking_details(
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<Json<BookingResponse>, AppError> {
    let details = state.ledger.get_booking_details(booking_id).await?;

    Ok(Json(BookingResponse {
        booking_id,
        passenger: details.passenger,
        train_id: details.train_id,
        seat_number: details.seat_number,
    }))
}

/// GET /v1/bookings
/// Bookings held by the authenticated passenger
async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<PassengerClaims>,
) -> Result<Json<Vec<PassengerBookingResponse>>, AppError> {
    let bookings = state.ledger.passenger_bookings(&claims.sub).await?;
    Ok(Json(bookings.into_iter().map(PassengerBookingResponse::from).collect()))
}
