use rail_catalog::TrainRegistry;
use rail_core::{Booking, BookingId, LedgerError, TrainId};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Set of `(passenger, train)` pairs that already hold a booking
#[derive(Debug, Clone, Default)]
pub struct PassengerBookingIndex {
    trains_by_passenger: HashMap<String, HashSet<TrainId>>,
    len: usize,
}

impl PassengerBookingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, passenger: &str, train_id: TrainId) -> bool {
        self.trains_by_passenger
            .get(passenger)
            .is_some_and(|trains| trains.contains(&train_id))
    }

    /// Returns false if the pair was already present
    pub fn insert(&mut self, passenger: &str, train_id: TrainId) -> bool {
        let inserted = self.trains_by_passenger
            .entry(passenger.to_string())
            .or_default()
            .insert(train_id);

        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Owns booking records and performs the reserve-one-seat transition
#[derive(Debug, Clone)]
pub struct BookingLedger {
    bookings: BTreeMap<BookingId, Booking>,
    index: PassengerBookingIndex,
    next_id: BookingId,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self {
            bookings: BTreeMap::new(),
            index: PassengerBookingIndex::new(),
            next_id: 1,
        }
    }

    /// Reserve one seat on `train_id` for `passenger`.
    ///
    /// Every check runs before the first write, so a failed call leaves both
    /// the registry and the ledger untouched and consumes no booking id.
    pub fn book(
        &mut self,
        registry: &mut TrainRegistry,
        train_id: TrainId,
        passenger: &str,
    ) -> Result<&Booking, BookingError> {
        let train = registry.get(train_id)
            .ok_or(BookingError::TrainNotFound(train_id))?;

        if train.available_seats == 0 {
            return Err(BookingError::NoAvailableSeats(train_id));
        }

        if self.index.contains(passenger, train_id) {
            return Err(BookingError::DuplicateBooking {
                passenger: passenger.to_string(),
                train_id,
            });
        }

        // Seats are handed out from the top: seat = available after decrement + 1.
        let seat_number = train.available_seats;
        ensure_seat_assignable(seat_number, train.capacity, train_id)?;

        registry.take_seat(train_id).map_err(|e| {
            BookingError::InvariantViolation(format!("seat pool rejected a checked booking: {}", e))
        })?;

        let id = self.next_id;
        self.next_id += 1;

        self.index.insert(passenger, train_id);
        let booking = self.bookings
            .entry(id)
            .or_insert(Booking::new(id, passenger.to_string(), train_id, seat_number));

        Ok(&*booking)
    }

    pub fn get(&self, booking_id: BookingId) -> Option<&Booking> {
        self.bookings.get(&booking_id)
    }

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    pub fn for_passenger<'a>(&'a self, passenger: &'a str) -> impl Iterator<Item = &'a Booking> + 'a {
        self.bookings.values().filter(move |b| b.passenger == passenger)
    }

    pub fn for_train(&self, train_id: TrainId) -> impl Iterator<Item = &Booking> {
        self.bookings.values().filter(move |b| b.train_id == train_id)
    }

    pub fn has_booking(&self, passenger: &str, train_id: TrainId) -> bool {
        self.index.contains(passenger, train_id)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

impl Default for BookingLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Post-condition on a seat about to be assigned. Unreachable while the
/// availability check above it holds.
fn ensure_seat_assignable(seat_number: u32, capacity: u32, train_id: TrainId) -> Result<(), BookingError> {
    if seat_number == 0 || seat_number > capacity {
        return Err(BookingError::InvariantViolation(format!(
            "seat {} outside 1..={} on train {}",
            seat_number, capacity, train_id
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("train {0}")]
    TrainNotFound(TrainId),

    #[error("no available seats on train {0}")]
    NoAvailableSeats(TrainId),

    #[error("duplicate booking for {passenger} on train {train_id}")]
    DuplicateBooking {
        passenger: String,
        train_id: TrainId,
    },

    #[error("{0}")]
    InvariantViolation(String),
}

impl From<BookingError> for LedgerError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::TrainNotFound(_) => LedgerError::NotFound(err.to_string()),
            BookingError::NoAvailableSeats(_) => LedgerError::ResourceExhausted(err.to_string()),
            BookingError::DuplicateBooking { .. } => LedgerError::AlreadyExists(err.to_string()),
            BookingError::InvariantViolation(msg) => LedgerError::InternalInvariantViolation(msg),
        }
    }
}
