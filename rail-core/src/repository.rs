use async_trait::async_trait;
use crate::model::{Booking, BookingId, InvariantBreach, LedgerStats, Train, TrainId};
use crate::LedgerResult;

/// Backing store for the combined train and booking state.
///
/// `create_train` and `book_ticket` must be linearizable with respect to each
/// other. Inputs reaching the store are already validated.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn create_train(&self, name: &str, capacity: u32) -> LedgerResult<Train>;

    /// Reserve one seat as a single indivisible transition.
    async fn book_ticket(&self, train_id: TrainId, passenger: &str) -> LedgerResult<Booking>;

    async fn get_train(&self, train_id: TrainId) -> LedgerResult<Train>;

    async fn get_booking(&self, booking_id: BookingId) -> LedgerResult<Booking>;

    async fn list_trains(&self) -> LedgerResult<Vec<Train>>;

    async fn list_passenger_bookings(&self, passenger: &str) -> LedgerResult<Vec<Booking>>;

    async fn stats(&self) -> LedgerResult<LedgerStats>;

    async fn audit(&self) -> LedgerResult<Vec<InvariantBreach>>;
}
