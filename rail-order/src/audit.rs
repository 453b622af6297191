use rail_core::{Booking, Invariant, InvariantBreach, Train, TrainId};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Check a snapshot of trains and bookings against the ledger invariants.
///
/// Returns every breach found; an empty list means the snapshot is sound.
pub fn audit_records<'a>(
    trains: impl IntoIterator<Item = &'a Train>,
    bookings: impl IntoIterator<Item = &'a Booking>,
) -> Vec<InvariantBreach> {
    let trains: BTreeMap<TrainId, &Train> = trains.into_iter().map(|t| (t.id, t)).collect();
    let bookings: Vec<&Booking> = bookings.into_iter().collect();
    let mut breaches = Vec::new();

    check_dense("train", trains.keys().copied(), &mut breaches);
    check_dense("booking", bookings.iter().map(|b| b.id), &mut breaches);

    let mut per_train: HashMap<TrainId, Vec<u32>> = HashMap::new();
    let mut pairs: HashSet<(&str, TrainId)> = HashSet::new();

    for booking in &bookings {
        let Some(train) = trains.get(&booking.train_id) else {
            breaches.push(InvariantBreach::new(
                Invariant::TrainReference,
                format!("booking {} references missing train {}", booking.id, booking.train_id),
            ));
            continue;
        };

        if !pairs.insert((booking.passenger.as_str(), booking.train_id)) {
            breaches.push(InvariantBreach::new(
                Invariant::PassengerUniqueness,
                format!("{} holds more than one booking on train {}", booking.passenger, train.id),
            ));
        }

        // Seats are handed out top-down, so every taken seat sits above the
        // remaining pool.
        if booking.seat_number <= train.available_seats || booking.seat_number > train.capacity {
            breaches.push(InvariantBreach::new(
                Invariant::SeatRange,
                format!(
                    "booking {} has seat {} on train {} (capacity {}, available {})",
                    booking.id, booking.seat_number, train.id, train.capacity, train.available_seats
                ),
            ));
        }

        per_train.entry(train.id).or_default().push(booking.seat_number);
    }

    for train in trains.values() {
        let seats = per_train.remove(&train.id).unwrap_or_default();
        let unique: HashSet<u32> = seats.iter().copied().collect();

        if unique.len() != seats.len() {
            breaches.push(InvariantBreach::new(
                Invariant::SeatRange,
                format!("train {} has a seat assigned twice", train.id),
            ));
        }

        if train.available_seats > train.capacity
            || seats.len() as u64 != u64::from(train.capacity - train.available_seats)
        {
            breaches.push(InvariantBreach::new(
                Invariant::SeatAccounting,
                format!(
                    "train {} has {} bookings but capacity {} and {} available",
                    train.id, seats.len(), train.capacity, train.available_seats
                ),
            ));
        }
    }

    breaches
}

fn check_dense(label: &str, ids: impl Iterator<Item = u64>, breaches: &mut Vec<InvariantBreach>) {
    let mut ids: Vec<u64> = ids.collect();
    ids.sort_unstable();

    for (expected, id) in (1u64..).zip(ids.iter().copied()) {
        if id != expected {
            breaches.push(InvariantBreach::new(
                Invariant::DenseIds,
                format!("{} ids are not dense: expected {}, found {}", label, expected, id),
            ));
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(id: TrainId, capacity: u32, available_seats: u32) -> Train {
        Train {
            available_seats,
            ..Train::new(id, format!("Train {}", id), capacity)
        }
    }

    fn booking(id: u64, passenger: &str, train_id: TrainId, seat_number: u32) -> Booking {
        Booking::new(id, passenger.to_string(), train_id, seat_number)
    }

    #[test]
    fn test_sound_snapshot() {
        let trains = vec![train(1, 3, 1), train(2, 1, 1)];
        let bookings = vec![booking(1, "alice", 1, 3), booking(2, "bob", 1, 2)];

        assert!(audit_records(&trains, &bookings).is_empty());
    }

    #[test]
    fn test_detects_each_breach() {
        let trains = vec![train(1, 3, 1), train(3, 2, 2)];
        let bookings = vec![
            booking(1, "alice", 1, 3),
            booking(2, "alice", 1, 3),
            booking(4, "bob", 7, 1),
        ];

        let found: HashSet<Invariant> = audit_records(&trains, &bookings)
            .into_iter()
            .map(|b| b.invariant)
            .collect();

        assert!(found.contains(&Invariant::DenseIds));
        assert!(found.contains(&Invariant::TrainReference));
        assert!(found.contains(&Invariant::PassengerUniqueness));
        assert!(found.contains(&Invariant::SeatRange));
    }

    #[test]
    fn test_detects_lost_update() {
        // Two bookings recorded but only one seat taken from the pool
        let trains = vec![train(1, 3, 2)];
        let bookings = vec![booking(1, "alice", 1, 3), booking(2, "bob", 1, 2)];

        let breaches = audit_records(&trains, &bookings);
        assert!(breaches.iter().any(|b| b.invariant == Invariant::SeatAccounting));
    }
}
