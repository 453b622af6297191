use axum::{
    extract::State,
    Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use jsonwebtoken::{encode, Header, EncodingKey};
use chrono::{Utc, Duration};
use uuid::Uuid;
use rail_core::LedgerError;
use crate::{state::AppState, error::AppError, extract::ApiJson, middleware::auth::{PassengerClaims, PASSENGER_ROLE}};

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub passenger: String,
}

#[derive(Debug, Deserialize)]
pub struct PassengerLoginRequest {
    pub passenger: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/guest", post(login_guest))
        .route("/v1/auth/passenger", post(login_passenger))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    issue_token(&state, format!("guest-{}", Uuid::new_v4())).map(Json)
}

/// Development login: signs a token for whatever passenger name is asked
/// for, with no credential check. Disabled unless `auth.allow_named_login`
/// is set, since any caller could otherwise book under someone else's name.
async fn login_passenger(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PassengerLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if !state.auth.allow_named_login {
        return Err(AppError::AuthorizationError("Named passenger login is disabled".to_string()));
    }

    let passenger = req.passenger.trim();
    if passenger.is_empty() {
        return Err(LedgerError::InvalidArgument("passenger identity empty".to_string()).into());
    }

    issue_token(&state, passenger.to_string()).map(Json)
}

pub fn issue_token(state: &AppState, passenger: String) -> Result<AuthResponse, AppError> {
    let claims = PassengerClaims {
        sub: passenger.clone(),
        role: PASSENGER_ROLE.to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(AuthResponse { token, passenger })
}
