use rail_core::{LedgerError, Train, TrainId};
use std::collections::BTreeMap;

/// Owns train records and their remaining seat counts.
///
/// Not synchronised; callers hold it behind the same lock as the booking
/// ledger so seat changes and booking inserts commit together.
#[derive(Debug, Clone)]
pub struct TrainRegistry {
    trains: BTreeMap<TrainId, Train>,
    next_id: TrainId,
}

impl TrainRegistry {
    pub fn new() -> Self {
        Self {
            trains: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a new train with every seat available
    pub fn create(&mut self, name: &str, capacity: u32) -> Result<&Train, RegistryError> {
        let capacity = validate_train_request(name, i64::from(capacity))?;

        let id = self.next_id;
        self.next_id += 1;

        let train = self.trains.entry(id).or_insert(Train::new(id, name.to_string(), capacity));
        Ok(&*train)
    }

    pub fn get(&self, train_id: TrainId) -> Option<&Train> {
        self.trains.get(&train_id)
    }

    pub fn available_seats(&self, train_id: TrainId) -> Result<u32, RegistryError> {
        self.get(train_id)
            .map(|train| train.available_seats)
            .ok_or(RegistryError::NotFound(train_id))
    }

    /// Remove one seat from the pool, returning the pre-decrement count.
    ///
    /// That count doubles as the seat number handed to the passenger, so the
    /// first booking on a train gets seat = capacity and the last gets seat 1.
    pub fn take_seat(&mut self, train_id: TrainId) -> Result<u32, RegistryError> {
        let train = self.trains.get_mut(&train_id)
            .ok_or(RegistryError::NotFound(train_id))?;

        if train.available_seats == 0 {
            return Err(RegistryError::SoldOut(train_id));
        }

        let seat_number = train.available_seats;
        train.available_seats -= 1;

        Ok(seat_number)
    }

    pub fn trains(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }
}

impl Default for TrainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check caller input for a new train and narrow the capacity to a seat count
pub fn validate_train_request(name: &str, capacity: i64) -> Result<u32, RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::EmptyName);
    }

    if capacity < 1 {
        return Err(RegistryError::NonPositiveCapacity(capacity));
    }

    u32::try_from(capacity).map_err(|_| RegistryError::CapacityTooLarge(capacity))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("name empty")]
    EmptyName,

    #[error("capacity must be positive, got {0}")]
    NonPositiveCapacity(i64),

    #[error("capacity {0} exceeds the seat range")]
    CapacityTooLarge(i64),

    #[error("train {0}")]
    NotFound(TrainId),

    #[error("no available seats on train {0}")]
    SoldOut(TrainId),
}

impl From<RegistryError> for LedgerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EmptyName
            | RegistryError::NonPositiveCapacity(_)
            | RegistryError::CapacityTooLarge(_) => LedgerError::InvalidArgument(err.to_string()),
            RegistryError::NotFound(_) => LedgerError::NotFound(err.to_string()),
            RegistryError::SoldOut(_) => LedgerError::ResourceExhausted(err.to_string()),
        }
    }
}
