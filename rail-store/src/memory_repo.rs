use async_trait::async_trait;
use rail_core::{
    Booking, BookingId, InvariantBreach, LedgerRepository, LedgerResult, LedgerStats, Train, TrainId,
};
use rail_order::LedgerState;
use tokio::sync::RwLock;

/// Process-local ledger store.
///
/// One lock covers trains and bookings together: mutations hold the write
/// guard across check, decrement, id assignment and insert, reads share the
/// read guard. No guard is held across an await point.
#[derive(Default)]
pub struct InMemoryLedgerRepository {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn create_train(&self, name: &str, capacity: u32) -> LedgerResult<Train> {
        self.state.write().await.create_train(name, capacity)
    }

    async fn book_ticket(&self, train_id: TrainId, passenger: &str) -> LedgerResult<Booking> {
        self.state.write().await.book_ticket(train_id, passenger)
    }

    async fn get_train(&self, train_id: TrainId) -> LedgerResult<Train> {
        self.state.read().await.train(train_id)
    }

    async fn get_booking(&self, booking_id: BookingId) -> LedgerResult<Booking> {
        self.state.read().await.booking(booking_id)
    }

    async fn list_trains(&self) -> LedgerResult<Vec<Train>> {
        Ok(self.state.read().await.trains())
    }

    async fn list_passenger_bookings(&self, passenger: &str) -> LedgerResult<Vec<Booking>> {
        Ok(self.state.read().await.passenger_bookings(passenger))
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        Ok(self.state.read().await.stats())
    }

    async fn audit(&self) -> LedgerResult<Vec<InvariantBreach>> {
        Ok(self.state.read().await.audit())
    }
}
