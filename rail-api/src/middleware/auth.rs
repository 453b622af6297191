use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub const PASSENGER_ROLE: &str = "PASSENGER";

/// The token subject is the passenger identity bookings are made under
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PassengerClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub async fn passenger_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let token = req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    // 2. Decode and validate JWT
    let token_data = decode::<PassengerClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    ).map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    // 3. Check role
    if token_data.claims.role != PASSENGER_ROLE {
        return Err(AppError::AuthorizationError("Passenger token required".to_string()));
    }

    // 4. Inject claims into request extensions
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
