use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TrainId = u64;
pub type BookingId = u64;

/// A capacity-bounded train
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Train {
    pub id: TrainId,
    pub name: String,
    pub capacity: u32,
    pub available_seats: u32,
    pub created_at: DateTime<Utc>,
}

impl Train {
    pub fn new(id: TrainId, name: String, capacity: u32) -> Self {
        Self {
            id,
            name,
            capacity,
            available_seats: capacity,
            created_at: Utc::now(),
        }
    }

    pub fn booked_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.available_seats)
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }
}

/// An immutable seat assignment for one passenger on one train
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: BookingId,
    pub passenger: String,
    pub train_id: TrainId,
    pub seat_number: u32,
    pub booked_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(id: BookingId, passenger: String, train_id: TrainId, seat_number: u32) -> Self {
        Self {
            id,
            passenger,
            train_id,
            seat_number,
            booked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingDetails {
    pub passenger: String,
    pub train_id: TrainId,
    pub seat_number: u32,
}

impl From<&Booking> for BookingDetails {
    fn from(booking: &Booking) -> Self {
        Self {
            passenger: booking.passenger.clone(),
            train_id: booking.train_id,
            seat_number: booking.seat_number,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerStats {
    pub train_count: u64,
    pub booking_count: u64,
}

/// Ledger-wide invariants checked by an audit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Invariant {
    TrainReference,
    SeatAccounting,
    PassengerUniqueness,
    SeatRange,
    DenseIds,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invariant::TrainReference => "train-reference",
            Invariant::SeatAccounting => "seat-accounting",
            Invariant::PassengerUniqueness => "passenger-uniqueness",
            Invariant::SeatRange => "seat-range",
            Invariant::DenseIds => "dense-ids",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvariantBreach {
    pub invariant: Invariant,
    pub detail: String,
}

impl InvariantBreach {
    pub fn new(invariant: Invariant, detail: impl Into<String>) -> Self {
        Self {
            invariant,
            detail: detail.into(),
        }
    }
}
