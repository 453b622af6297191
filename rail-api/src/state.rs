use std::sync::Arc;
use rail_order::ReservationService;
use rail_store::EventProducer;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    /// Whether callers may pick their own passenger name at login
    pub allow_named_login: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<ReservationService>,
    pub events: EventProducer,
    pub auth: AuthConfig,
}
