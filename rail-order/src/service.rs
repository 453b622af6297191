use chrono::Utc;
use rail_catalog::validate_train_request;
use rail_core::{
    Booking, BookingDetails, BookingId, EventPublisher, InvariantBreach, LedgerError, LedgerRepository,
    LedgerResult, LedgerStats, Train, TrainId,
};
use rail_shared::{LedgerEvent, TicketBookedEvent, TrainCreatedEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Tracing target for correctness alarms, kept apart from request noise
pub const INVARIANT_TARGET: &str = "rail::invariant";

/// Operation surface of the reservation ledger.
///
/// Validates caller input before touching the store, delegates the atomic
/// transition to the repository and publishes notifications once a change
/// has committed.
///
/// Mutations hold `commit_gate` from the store call until their event has
/// been handed to the publisher, so subscribers see events in commit order.
/// Reads never take the gate.
pub struct ReservationService {
    repo: Arc<dyn LedgerRepository>,
    publisher: Arc<dyn EventPublisher>,
    commit_gate: Mutex<()>,
}

impl ReservationService {
    pub fn new(repo: Arc<dyn LedgerRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { repo, publisher, commit_gate: Mutex::new(()) }
    }

    /// CreateTrain
    pub async fn create_train(&self, name: &str, capacity: i64) -> LedgerResult<Train> {
        let capacity = validate_train_request(name, capacity).map_err(|e| {
            debug!("Rejected train creation: {}", e);
            LedgerError::from(e)
        })?;

        let _commit = self.commit_gate.lock().await;
        let train = self.repo.create_train(name, capacity).await.map_err(|e| self.report("create_train", e))?;
        info!("Train created: id={} name={:?} capacity={}", train.id, train.name, train.capacity);

        self.notify(LedgerEvent::TrainCreated(TrainCreatedEvent {
            train_id: train.id,
            name: train.name.clone(),
            capacity: train.capacity,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(train)
    }

    /// BookTicket
    pub async fn book_ticket(&self, train_id: TrainId, passenger: &str) -> LedgerResult<Booking> {
        if passenger.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("passenger identity empty".to_string()));
        }

        let _commit = self.commit_gate.lock().await;
        let booking = self.repo.book_ticket(train_id, passenger).await.map_err(|e| self.report("book_ticket", e))?;
        info!(
            "Ticket booked: booking={} train={} seat={} passenger={}",
            booking.id, booking.train_id, booking.seat_number, booking.passenger
        );

        self.notify(LedgerEvent::TicketBooked(TicketBookedEvent {
            booking_id: booking.id,
            passenger: booking.passenger.clone(),
            train_id: booking.train_id,
            seat_number: booking.seat_number,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(booking)
    }

    /// GetAvailableSeats
    pub async fn get_available_seats(&self, train_id: TrainId) -> LedgerResult<u32> {
        let train = self.repo.get_train(train_id).await.map_err(|e| self.report("get_available_seats", e))?;
        Ok(train.available_seats)
    }

    /// GetBookingDetails
    pub async fn get_booking_details(&self, booking_id: BookingId) -> LedgerResult<BookingDetails> {
        let booking = self.repo.get_booking(booking_id).await.map_err(|e| self.report("get_booking_details", e))?;
        Ok(BookingDetails::from(&booking))
    }

    pub async fn get_train(&self, train_id: TrainId) -> LedgerResult<Train> {
        self.repo.get_train(train_id).await.map_err(|e| self.report("get_train", e))
    }

    pub async fn get_booking(&self, booking_id: BookingId) -> LedgerResult<Booking> {
        self.repo.get_booking(booking_id).await.map_err(|e| self.report("get_booking", e))
    }

    pub async fn list_trains(&self) -> LedgerResult<Vec<Train>> {
        self.repo.list_trains().await.map_err(|e| self.report("list_trains", e))
    }

    pub async fn passenger_bookings(&self, passenger: &str) -> LedgerResult<Vec<Booking>> {
        self.repo.list_passenger_bookings(passenger).await.map_err(|e| self.report("passenger_bookings", e))
    }

    pub async fn stats(&self) -> LedgerResult<LedgerStats> {
        self.repo.stats().await.map_err(|e| self.report("stats", e))
    }

    /// Run the invariant audit; any breach is raised as a correctness alarm.
    pub async fn audit(&self) -> LedgerResult<Vec<InvariantBreach>> {
        let breaches = self.repo.audit().await.map_err(|e| self.report("audit", e))?;

        for breach in &breaches {
            error!(target: INVARIANT_TARGET, invariant = %breach.invariant, "Ledger audit breach: {}", breach.detail);
        }

        Ok(breaches)
    }

    fn report(&self, operation: &str, err: LedgerError) -> LedgerError {
        match &err {
            LedgerError::InternalInvariantViolation(msg) => {
                error!(target: INVARIANT_TARGET, operation, "Internal invariant violated: {}", msg);
            }
            LedgerError::Storage(msg) => {
                error!(operation, "Storage failure: {}", msg);
            }
            _ => {
                debug!(operation, "Request rejected: {}", err);
            }
        }
        err
    }

    async fn notify(&self, event: LedgerEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            warn!("Failed to publish {} event: {}", event.topic(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LedgerState;
    use async_trait::async_trait;
    use rail_core::ErrorKind;

    struct StateRepository {
        state: Mutex<LedgerState>,
    }

    #[async_trait]
    impl LedgerRepository for StateRepository {
        async fn create_train(&self, name: &str, capacity: u32) -> LedgerResult<Train> {
            self.state.lock().await.create_train(name, capacity)
        }

        async fn book_ticket(&self, train_id: TrainId, passenger: &str) -> LedgerResult<Booking> {
            self.state.lock().await.book_ticket(train_id, passenger)
        }

        async fn get_train(&self, train_id: TrainId) -> LedgerResult<Train> {
            self.state.lock().await.train(train_id)
        }

        async fn get_booking(&self, booking_id: BookingId) -> LedgerResult<Booking> {
            self.state.lock().await.booking(booking_id)
        }

        async fn list_trains(&self) -> LedgerResult<Vec<Train>> {
            Ok(self.state.lock().await.trains())
        }

        async fn list_passenger_bookings(&self, passenger: &str) -> LedgerResult<Vec<Booking>> {
            Ok(self.state.lock().await.passenger_bookings(passenger))
        }

        async fn stats(&self) -> LedgerResult<LedgerStats> {
            Ok(self.state.lock().await.stats())
        }

        async fn audit(&self) -> LedgerResult<Vec<InvariantBreach>> {
            Ok(self.state.lock().await.audit())
        }
    }

    /// Store whose booking path always trips the internal self-check
    struct BrokenRepository;

    #[async_trait]
    impl LedgerRepository for BrokenRepository {
        async fn create_train(&self, _name: &str, _capacity: u32) -> LedgerResult<Train> {
            Err(LedgerError::Storage("offline".to_string()))
        }

        async fn book_ticket(&self, _train_id: TrainId, _passenger: &str) -> LedgerResult<Booking> {
            Err(LedgerError::InternalInvariantViolation("seat 0 assigned".to_string()))
        }

        async fn get_train(&self, train_id: TrainId) -> LedgerResult<Train> {
            Err(LedgerError::train_not_found(train_id))
        }

        async fn get_booking(&self, booking_id: BookingId) -> LedgerResult<Booking> {
            Err(LedgerError::booking_not_found(booking_id))
        }

        async fn list_trains(&self) -> LedgerResult<Vec<Train>> {
            Ok(vec![])
        }

        async fn list_passenger_bookings(&self, _passenger: &str) -> LedgerResult<Vec<Booking>> {
            Ok(vec![])
        }

        async fn stats(&self) -> LedgerResult<LedgerStats> {
            Ok(LedgerStats::default())
        }

        async fn audit(&self) -> LedgerResult<Vec<InvariantBreach>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<LedgerEvent>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.events.lock().await.push(event.clone());
            Ok(())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("bus unavailable".into())
        }
    }

    fn service() -> (ReservationService, Arc<RecordingPublisher>) {
        let repo = Arc::new(StateRepository { state: Mutex::new(LedgerState::new()) });
        let publisher = Arc::new(RecordingPublisher::default());
        (ReservationService::new(repo, publisher.clone()), publisher)
    }

    #[tokio::test]
    async fn test_operations_emit_notifications() {
        let (service, publisher) = service();

        let train = service.create_train("Express 101", 3).await.unwrap();
        let booking = service.book_ticket(train.id, "alice").await.unwrap();
        assert_eq!(booking.seat_number, 3);

        let events = publisher.events.lock().await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            LedgerEvent::TrainCreated(e) => {
                assert_eq!((e.train_id, e.name.as_str(), e.capacity), (1, "Express 101", 3));
            }
            other => panic!("unexpected event {:?}", other),
        }
        match &events[1] {
            LedgerEvent::TicketBooked(e) => {
                assert_eq!((e.booking_id, e.passenger.as_str(), e.train_id, e.seat_number), (1, "alice", 1, 3));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejections_are_silent() {
        let (service, publisher) = service();

        assert_eq!(service.create_train("", 5).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(service.create_train("Express", 0).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(service.create_train("Express", -3).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(service.stats().await.unwrap().train_count, 0);

        service.create_train("Express 101", 1).await.unwrap();
        service.book_ticket(1, "alice").await.unwrap();

        assert_eq!(service.book_ticket(1, "bob").await.unwrap_err().kind(), ErrorKind::ResourceExhausted);
        assert_eq!(service.book_ticket(2, "bob").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.book_ticket(1, " ").await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(service.get_booking_details(99).await.unwrap_err().kind(), ErrorKind::NotFound);

        // Only the two successful operations were announced
        assert_eq!(publisher.events.lock().await.len(), 2);
        assert!(service.audit().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_operations() {
        let (service, _) = service();
        service.create_train("Express 101", 3).await.unwrap();
        service.create_train("Coastal", 2).await.unwrap();
        service.book_ticket(2, "alice").await.unwrap();

        assert_eq!(service.get_available_seats(1).await.unwrap(), 3);
        assert_eq!(service.get_available_seats(2).await.unwrap(), 1);

        let details = service.get_booking_details(1).await.unwrap();
        assert_eq!(details, BookingDetails { passenger: "alice".to_string(), train_id: 2, seat_number: 2 });

        let names: Vec<String> = service.list_trains().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Express 101", "Coastal"]);
        assert_eq!(service.passenger_bookings("alice").await.unwrap().len(), 1);
        assert!(service.passenger_bookings("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invariant_violation_is_distinguishable() {
        let publisher = Arc::new(RecordingPublisher::default());
        let service = ReservationService::new(Arc::new(BrokenRepository), publisher.clone());

        let err = service.book_ticket(1, "alice").await.unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(err.kind(), ErrorKind::InternalInvariantViolation);

        let err = service.create_train("Express", 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(publisher.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_operation() {
        let repo = Arc::new(StateRepository { state: Mutex::new(LedgerState::new()) });
        let service = ReservationService::new(repo, Arc::new(FailingPublisher));

        let train = service.create_train("Express 101", 2).await.unwrap();
        service.book_ticket(train.id, "alice").await.unwrap();
        assert_eq!(service.get_available_seats(train.id).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_notifications_follow_commit_order() {
        let (service, publisher) = service();
        let service = Arc::new(service);
        let train = service.create_train("Express 101", 300).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..300 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.book_ticket(train.id, &format!("p{}", i)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let events = publisher.events.lock().await;
        let booked: Vec<(BookingId, u32)> = events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::TicketBooked(e) => Some((e.booking_id, e.seat_number)),
                _ => None,
            })
            .collect();
        assert_eq!(booked.len(), 300);

        // Each booking was announced before the next one committed
        for (i, (booking_id, seat_number)) in booked.iter().enumerate() {
            assert_eq!(*booking_id, i as u64 + 1);
            assert_eq!(*seat_number, 300 - i as u32);
        }
    }
}
