use rail_catalog::TrainRegistry;
use rail_core::{
    Booking, BookingDetails, BookingId, InvariantBreach, LedgerError, LedgerResult, LedgerStats, Train, TrainId,
};
use crate::audit::audit_records;
use crate::ledger::BookingLedger;

/// Trains and bookings as one unit of state.
///
/// Every mutation goes through `&mut self`, so wrapping a `LedgerState` in a
/// single lock is enough to make train creation and booking linearizable.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    registry: TrainRegistry,
    ledger: BookingLedger,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_train(&mut self, name: &str, capacity: u32) -> LedgerResult<Train> {
        Ok(self.registry.create(name, capacity)?.clone())
    }

    pub fn book_ticket(&mut self, train_id: TrainId, passenger: &str) -> LedgerResult<Booking> {
        Ok(self.ledger.book(&mut self.registry, train_id, passenger)?.clone())
    }

    pub fn available_seats(&self, train_id: TrainId) -> LedgerResult<u32> {
        Ok(self.registry.available_seats(train_id)?)
    }

    pub fn train(&self, train_id: TrainId) -> LedgerResult<Train> {
        self.registry.get(train_id)
            .cloned()
            .ok_or_else(|| LedgerError::train_not_found(train_id))
    }

    pub fn booking(&self, booking_id: BookingId) -> LedgerResult<Booking> {
        self.ledger.get(booking_id)
            .cloned()
            .ok_or_else(|| LedgerError::booking_not_found(booking_id))
    }

    pub fn booking_details(&self, booking_id: BookingId) -> LedgerResult<BookingDetails> {
        self.ledger.get(booking_id)
            .map(BookingDetails::from)
            .ok_or_else(|| LedgerError::booking_not_found(booking_id))
    }

    pub fn trains(&self) -> Vec<Train> {
        self.registry.trains().cloned().collect()
    }

    pub fn passenger_bookings(&self, passenger: &str) -> Vec<Booking> {
        self.ledger.for_passenger(passenger).cloned().collect()
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            train_count: self.registry.len() as u64,
            booking_count: self.ledger.len() as u64,
        }
    }

    pub fn audit(&self) -> Vec<InvariantBreach> {
        audit_records(self.registry.trains(), self.ledger.bookings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rail_core::ErrorKind;

    #[test]
    fn test_reservation_walkthrough() {
        let mut state = LedgerState::new();

        // Create
        let train = state.create_train("Express 101", 3).unwrap();
        assert_eq!(train.id, 1);
        assert_eq!(state.available_seats(1).unwrap(), 3);

        // First booking takes the highest seat
        let booking = state.book_ticket(1, "alice").unwrap();
        assert_eq!(booking.id, 1);
        assert_eq!(booking.seat_number, 3);
        assert_eq!(state.available_seats(1).unwrap(), 2);

        // Duplicate rejected, nothing changes
        let err = state.book_ticket(1, "alice").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(state.available_seats(1).unwrap(), 2);

        // Exhaust the train
        state.book_ticket(1, "bob").unwrap();
        state.book_ticket(1, "carol").unwrap();
        assert_eq!(state.available_seats(1).unwrap(), 0);
        let err = state.book_ticket(1, "dave").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        let details = state.booking_details(1).unwrap();
        assert_eq!(details.passenger, "alice");
        assert_eq!(details.train_id, 1);
        assert_eq!(details.seat_number, 3);

        assert_eq!(state.stats(), LedgerStats { train_count: 1, booking_count: 3 });
        assert!(state.audit().is_empty());
    }

    #[test]
    fn test_lookups_on_missing_records() {
        let mut state = LedgerState::new();

        assert_eq!(state.booking_details(99).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(state.available_seats(1).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(state.book_ticket(1, "alice").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(state.train(1).unwrap_err().kind(), ErrorKind::NotFound);

        let err = state.create_train("", 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(state.stats().train_count, 0);
    }

    #[test]
    fn test_seat_accounting_across_trains() {
        let mut state = LedgerState::new();
        state.create_train("Express 101", 4).unwrap();
        state.create_train("Coastal", 2).unwrap();

        let passengers = ["p1", "p2", "p3", "p4", "p5", "p6"];
        for (i, p) in passengers.iter().enumerate() {
            let train_id = (i % 2 + 1) as u64;
            let _ = state.book_ticket(train_id, p);
            let _ = state.book_ticket(train_id, p);
        }

        for train in state.trains() {
            let on_train = passengers
                .iter()
                .flat_map(|p| state.passenger_bookings(p))
                .filter(|b| b.train_id == train.id)
                .count() as u32;
            assert_eq!(train.available_seats + on_train, train.capacity);
        }

        assert_eq!(state.available_seats(1).unwrap(), 1);
        assert_eq!(state.available_seats(2).unwrap(), 0);

        // Booking ids stay dense despite the rejected duplicates and overflow
        let mut ids: Vec<u64> = passengers
            .iter()
            .flat_map(|p| state.passenger_bookings(p))
            .map(|b| b.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=ids.len() as u64).collect::<Vec<_>>());
        assert!(state.audit().is_empty());
    }
}
